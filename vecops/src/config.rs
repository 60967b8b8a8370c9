use crate::VecError;

pub const DEFAULT_PARALLEL_ORDER: usize = 20;
pub const DEFAULT_SERIAL_ORDER: usize = 100_000;
pub const DEFAULT_SCALAR: f64 = 2.5;

/// Parameters of one parallel run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Global vector order `n`.
    pub order: usize,
    /// Number of workers the order is split across.
    pub worker_count: usize,
    /// Factor applied by the scalar transform.
    pub scalar: f64,
}

impl RunConfig {
    pub fn new(order: usize, worker_count: usize) -> Self {
        Self {
            order,
            worker_count,
            scalar: DEFAULT_SCALAR,
        }
    }

    pub fn with_scalar(mut self, scalar: f64) -> Self {
        self.scalar = scalar;
        self
    }

    /// Length of the block owned by each worker.
    pub fn local_order(&self) -> Result<usize, VecError> {
        if self.order == 0 {
            return Err(VecError::InvalidOrder);
        }
        if self.worker_count == 0 || self.order % self.worker_count != 0 {
            return Err(VecError::NotDivisible {
                order: self.order,
                workers: self.worker_count,
            });
        }
        Ok(self.order / self.worker_count)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLEL_ORDER, 1)
    }
}

/// Parameters of the serial program.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    pub order: usize,
    /// Read the order and both vectors from the input instead of
    /// generating them.
    pub interactive: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_SERIAL_ORDER,
            interactive: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_order() {
        assert_eq!(RunConfig::new(20, 4).local_order().unwrap(), 5);
        assert_eq!(RunConfig::new(8, 8).local_order().unwrap(), 1);
    }

    #[test]
    fn test_zero_order() {
        assert!(matches!(
            RunConfig::new(0, 2).local_order(),
            Err(VecError::InvalidOrder)
        ));
    }

    #[test]
    fn test_not_divisible() {
        assert!(matches!(
            RunConfig::new(20, 3).local_order(),
            Err(VecError::NotDivisible {
                order: 20,
                workers: 3
            })
        ));
        assert!(matches!(
            RunConfig::new(20, 0).local_order(),
            Err(VecError::NotDivisible { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.order, 20);
        assert_eq!(config.scalar, 2.5);
        assert_eq!(SerialConfig::default().order, 100_000);
        assert_eq!(RunConfig::new(4, 2).with_scalar(-1.0).scalar, -1.0);
    }
}
