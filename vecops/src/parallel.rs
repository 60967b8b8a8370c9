//! Dot product and scalar multiplication over block-distributed vectors.
//!
//! Each worker owns `order / worker_count` contiguous elements of `x` and
//! `y`. Only the coordinator receives the reduced dot product, assembles
//! the full vectors and writes output.
use crate::vector::{self, LocalVectors};
use crate::{RunConfig, VecError};
use async_comm::{
    barrier, gather_to, reduce_sum, CommError, CommGroup, ABORT_CODE, COORDINATOR,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::time::Instant;

pub const X_BEFORE_TITLE: &str = "Vector x (before scalar multiplication):";
pub const Y_BEFORE_TITLE: &str = "Vector y (before scalar multiplication):";
pub const X_AFTER_TITLE: &str = "Vector x (after scalar multiplication):";
pub const Y_AFTER_TITLE: &str = "Vector y (after scalar multiplication):";

/// Everything the coordinator observed during one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub x_before: Vec<f64>,
    pub y_before: Vec<f64>,
    pub x_after: Vec<f64>,
    pub y_after: Vec<f64>,
    pub dot_product: f64,
}

/// Turn a local failure into a group abort so no peer stays blocked in a
/// collective. Errors caused by an abort are passed through unchanged.
pub fn abort_on_error<G: CommGroup, T>(
    cg: &G,
    result: Result<T, VecError>,
) -> Result<T, VecError> {
    match result {
        Err(e @ VecError::Comm(CommError::Aborted { .. })) => Err(e),
        Err(e) => {
            cg.abort(ABORT_CODE);
            Err(e)
        }
        ok => ok,
    }
}

/// Allocate this worker's buffers, aborting the whole group on failure.
pub fn allocate_or_abort<G: CommGroup>(cg: &G, local_n: usize) -> Result<LocalVectors, VecError> {
    abort_on_error(cg, LocalVectors::allocate(local_n))
}

/// Pick the error to report for a group run.
///
/// A failing worker aborts its peers, so most workers report
/// `CommError::Aborted`; the first other error is the cause.
pub fn first_failure<T>(results: Vec<Result<T, VecError>>) -> Result<(), VecError> {
    let mut errors: Vec<VecError> = results.into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        return Ok(());
    }
    let cause = errors
        .iter()
        .position(|e| !matches!(e, VecError::Comm(CommError::Aborted { .. })))
        .unwrap_or(0);
    Err(errors.swap_remove(cause))
}

/// Sum of `local_x[i] * local_y[i]` over every worker, at the coordinator.
pub async fn parallel_dot_product<G: CommGroup>(
    cg: &G,
    local_x: &[f64],
    local_y: &[f64],
) -> Result<Option<f64>, VecError> {
    let local_dot = vector::dot_product(local_x, local_y);
    debug!("rank {}: local dot product {}", cg.rank(), local_dot);
    Ok(reduce_sum(cg, local_dot, COORDINATOR).await?)
}

pub fn parallel_scalar_multiplication(local_x: &mut [f64], local_y: &mut [f64], scalar: f64) {
    vector::scale_in_place(local_x, scalar);
    vector::scale_in_place(local_y, scalar);
}

/// Gather a distributed vector at the coordinator and print it there.
///
/// Collective: every worker must call it. Returns the full vector on the
/// coordinator and `None` elsewhere.
pub async fn print_vector<G: CommGroup, W: Write + ?Sized>(
    cg: &G,
    local: &[f64],
    title: &str,
    out: &mut W,
) -> Result<Option<Vec<f64>>, VecError> {
    let gathered = gather_to(cg, COORDINATOR, local).await?;
    if let Some(full) = &gathered {
        abort_on_error(cg, vector::write_vector(out, title, full).map_err(VecError::from))?;
    }
    Ok(gathered)
}

/// Print, reduce, scale and print again the already populated buffers.
///
/// Any local failure aborts the group.
pub async fn run_pipeline<G: CommGroup, W: Write + ?Sized>(
    cg: &G,
    vectors: &mut LocalVectors,
    scalar: f64,
    out: &mut W,
) -> Result<Option<Report>, VecError> {
    let result = pipeline(cg, vectors, scalar, out).await;
    abort_on_error(cg, result)
}

async fn pipeline<G: CommGroup, W: Write + ?Sized>(
    cg: &G,
    vectors: &mut LocalVectors,
    scalar: f64,
    out: &mut W,
) -> Result<Option<Report>, VecError> {
    barrier(cg).await?;

    let x_before = print_vector(cg, &vectors.x, X_BEFORE_TITLE, out).await?;
    let y_before = print_vector(cg, &vectors.y, Y_BEFORE_TITLE, out).await?;

    let dot_product = parallel_dot_product(cg, &vectors.x, &vectors.y).await?;

    parallel_scalar_multiplication(&mut vectors.x, &mut vectors.y, scalar);
    let x_after = print_vector(cg, &vectors.x, X_AFTER_TITLE, out).await?;
    let y_after = print_vector(cg, &vectors.y, Y_AFTER_TITLE, out).await?;

    match (x_before, y_before, x_after, y_after, dot_product) {
        (Some(x_before), Some(y_before), Some(x_after), Some(y_after), Some(dot_product)) => {
            writeln!(out, "Dot product: {dot_product:.6}\n")?;
            Ok(Some(Report {
                x_before,
                y_before,
                x_after,
                y_after,
                dot_product,
            }))
        }
        _ => Ok(None),
    }
}

/// Full parallel program for one worker: allocate, fill with random
/// values, then run the pipeline and report the elapsed time.
pub async fn run_worker<G: CommGroup, W: Write + ?Sized>(
    cg: &G,
    config: &RunConfig,
    out: &mut W,
) -> Result<Option<Report>, VecError> {
    if config.worker_count != cg.size() as usize {
        return Err(VecError::WorkerCountMismatch {
            configured: config.worker_count,
            actual: cg.size() as usize,
        });
    }
    let local_n = config.local_order()?;

    let start = Instant::now();
    let mut vectors = allocate_or_abort(cg, local_n)?;
    info!("rank {}: allocated {} elements per vector", cg.rank(), local_n);

    let mut rng = StdRng::seed_from_u64(vector::seed_for_rank(cg.rank()));
    vector::fill_random(&mut rng, &mut vectors.x);
    vector::fill_random(&mut rng, &mut vectors.y);

    let report = run_pipeline(cg, &mut vectors, config.scalar, out).await?;

    if cg.is_coordinator() {
        let elapsed = start.elapsed().as_secs_f64() * 1000.0;
        let written = writeln!(out, "Total time: {elapsed:.6} milliseconds");
        abort_on_error(cg, written.map_err(VecError::from))?;
        info!("finished in {elapsed:.3} ms");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_comm::run_local;
    use futures::executor;
    use std::io;

    /// Writer whose every write fails, like stdout after the reader left.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_two_worker_scenario() {
        let results = run_local(2, |cg| {
            let (x, y) = if cg.rank() == 0 {
                (vec![1.0, 2.0, 3.0, 4.0], vec![1.0; 4])
            } else {
                (vec![5.0, 6.0, 7.0, 8.0], vec![1.0; 4])
            };
            let mut vectors = LocalVectors::from_parts(x, y).unwrap();
            let mut out = Vec::new();
            let report = executor::block_on(run_pipeline(cg, &mut vectors, 2.0, &mut out));
            (report, out)
        })
        .unwrap();

        let (report, out) = &results[0];
        let report = report.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(report.dot_product, 36.0);
        assert_eq!(report.x_before, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(
            report.x_after,
            vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0]
        );
        assert_eq!(report.y_after, vec![2.0; 8]);

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with(X_BEFORE_TITLE));
        assert!(text.contains("2.000000 4.000000 6.000000 8.000000 10.000000"));
        assert!(text.contains("Dot product: 36.000000\n"));

        let (report, out) = &results[1];
        assert!(report.as_ref().unwrap().is_none());
        assert!(out.is_empty());
    }

    #[test]
    fn test_gathered_blocks_keep_rank_order() {
        let local_n = 3;
        let results = run_local(4, |cg| {
            let local: Vec<f64> = (0..local_n)
                .map(|i| (cg.rank() as usize * 100 + i) as f64)
                .collect();
            let mut out = Vec::new();
            executor::block_on(print_vector(cg, &local, "v:", &mut out))
        })
        .unwrap();

        let full = results[0].as_ref().unwrap().as_ref().unwrap();
        assert_eq!(full.len(), 12);
        for (i, value) in full.iter().enumerate() {
            let rank = i / local_n;
            assert_eq!(*value, (rank * 100 + i % local_n) as f64);
        }
    }

    #[test]
    fn test_distributed_dot_matches_serial() {
        let config = RunConfig::new(64, 4).with_scalar(0.5);
        let results = run_local(4, |cg| {
            let mut out = Vec::new();
            executor::block_on(run_worker(cg, &config, &mut out))
        })
        .unwrap();

        let report = results[0].as_ref().unwrap().as_ref().unwrap();
        let serial = vector::dot_product(&report.x_before, &report.y_before);
        assert!(close(report.dot_product, serial));
        for (before, after) in report.x_before.iter().zip(&report.x_after) {
            assert!((0.0..100.0).contains(before));
            assert!(close(before * 0.5, *after));
        }
        for result in &results[1..] {
            assert!(result.as_ref().unwrap().is_none());
        }
    }

    #[test]
    fn test_only_coordinator_writes() {
        let config = RunConfig::new(8, 4);
        let results = run_local(4, |cg| {
            let mut out = Vec::new();
            let report = executor::block_on(run_worker(cg, &config, &mut out));
            (report.is_ok(), String::from_utf8(out).unwrap_or_default())
        })
        .unwrap();

        let (ok, text) = &results[0];
        assert!(ok);
        assert!(text.contains(Y_AFTER_TITLE));
        assert!(text.contains("Total time: "));
        assert!(text.trim_end().ends_with("milliseconds"));
        for (ok, text) in &results[1..] {
            assert!(ok);
            assert!(text.is_empty());
        }
    }

    #[test]
    fn test_uneven_order_rejected() {
        let config = RunConfig::new(10, 3);
        let results = run_local(3, |cg| {
            let mut out = Vec::new();
            executor::block_on(run_worker(cg, &config, &mut out))
        })
        .unwrap();

        for result in results {
            assert!(matches!(
                result,
                Err(VecError::NotDivisible {
                    order: 10,
                    workers: 3
                })
            ));
        }
    }

    #[test]
    fn test_worker_count_mismatch() {
        let config = RunConfig::new(8, 4);
        let results = run_local(2, |cg| {
            let mut out = Vec::new();
            executor::block_on(run_worker(cg, &config, &mut out))
        })
        .unwrap();

        assert!(matches!(
            results[0],
            Err(VecError::WorkerCountMismatch {
                configured: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_allocation_failure_aborts_group() {
        let results = run_local(3, |cg| {
            let local_n = if cg.rank() == 1 { usize::MAX } else { 4 };
            let mut out = Vec::new();
            executor::block_on(async {
                let mut vectors = allocate_or_abort(cg, local_n)?;
                run_pipeline(cg, &mut vectors, 2.0, &mut out).await
            })
        })
        .unwrap();

        assert!(matches!(results[1], Err(VecError::Allocation { .. })));
        for rank in [0, 2] {
            assert!(matches!(
                results[rank],
                Err(VecError::Comm(CommError::Aborted { rank: 1, code: -1 }))
            ));
        }
    }

    #[test]
    fn test_coordinator_write_failure_aborts_group() {
        let config = RunConfig::new(8, 2);
        let results = run_local(2, |cg| {
            executor::block_on(run_worker(cg, &config, &mut BrokenPipe))
        })
        .unwrap();

        assert!(matches!(&results[0], Err(VecError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe));
        assert!(matches!(
            results[1],
            Err(VecError::Comm(CommError::Aborted { rank: 0, code: -1 }))
        ));
        assert!(matches!(first_failure(results), Err(VecError::Io(_))));
    }

    #[test]
    fn test_first_failure_prefers_cause() {
        let aborted = || VecError::Comm(CommError::Aborted { rank: 2, code: -1 });
        let results: Vec<Result<(), VecError>> = vec![
            Err(aborted()),
            Ok(()),
            Err(VecError::Allocation { len: 4 }),
            Err(aborted()),
        ];
        assert!(matches!(
            first_failure(results),
            Err(VecError::Allocation { len: 4 })
        ));

        let results: Vec<Result<(), VecError>> = vec![Ok(()), Err(aborted())];
        assert!(matches!(
            first_failure(results),
            Err(VecError::Comm(CommError::Aborted { rank: 2, .. }))
        ));
        assert!(first_failure(vec![Ok::<_, VecError>(1), Ok(2)]).is_ok());
    }
}
