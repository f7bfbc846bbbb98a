use std::future::Future;

use crate::{duration::format_millis, timing::TimingSession};

use super::BenchError;

#[derive(Debug)]
pub struct Timed<T> {
    pub millis: f64,
    pub outputs: Vec<T>,
}

/// Awaits `op(0)` through `op(count - 1)` one after another between the
/// marks `start<label>` and `stop<label>`, and measures the span as `label`.
///
/// The first failing operation aborts the loop and is returned as is.
pub async fn time_serial<T, F, Fut>(
    session: &mut TimingSession,
    label: &str,
    count: usize,
    mut op: F,
) -> Result<Timed<T>, BenchError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, BenchError>>,
{
    let start = format!("start{label}");
    let stop = format!("stop{label}");

    session.mark(&start)?;
    let mut outputs = Vec::with_capacity(count);
    for index in 0..count {
        outputs.push(op(index).await?);
    }
    session.mark(&stop)?;

    let measure = session.measure(label, &start, &stop)?;
    Ok(Timed {
        millis: format_millis(measure.duration_millis()),
        outputs,
    })
}
