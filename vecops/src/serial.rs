//! Serial vector addition, `z = x + y`, on a single process.
use crate::vector::{self, LocalVectors};
use crate::{SerialConfig, VecError};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::time::Instant;

/// Number of leading and trailing elements shown per vector.
pub const PREVIEW_LEN: usize = 10;

/// Splits an input stream into whitespace separated tokens, reading one
/// line at a time as needed.
pub struct TokenReader<R> {
    reader: R,
    tokens: VecDeque<String>,
}

impl<R: BufRead> TokenReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tokens: VecDeque::new(),
        }
    }

    pub fn next_token(&mut self) -> Result<Option<String>, VecError> {
        while self.tokens.is_empty() {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.tokens.extend(line.split_whitespace().map(str::to_owned));
        }
        Ok(self.tokens.pop_front())
    }

    fn expect_token(&mut self, what: &str) -> Result<String, VecError> {
        self.next_token()?
            .ok_or_else(|| VecError::UnexpectedEof(what.to_owned()))
    }
}

/// Prompt for and read the order of the vectors. Rejects `n <= 0`.
pub fn read_order<R: BufRead, W: Write + ?Sized>(
    input: &mut TokenReader<R>,
    out: &mut W,
) -> Result<usize, VecError> {
    writeln!(out, "What's the order of the vectors?")?;
    out.flush()?;

    let what = "the vector order";
    let token = input.expect_token(what)?;
    let n: i64 = token.parse().map_err(|_| VecError::Parse {
        token: token.clone(),
        what: what.to_owned(),
    })?;
    if n <= 0 {
        return Err(VecError::InvalidOrder);
    }
    usize::try_from(n).map_err(|_| VecError::Allocation { len: usize::MAX })
}

/// Prompt for and read `values.len()` numbers into `values`.
pub fn read_vector<R: BufRead, W: Write + ?Sized>(
    input: &mut TokenReader<R>,
    out: &mut W,
    values: &mut [f64],
    name: &str,
) -> Result<(), VecError> {
    writeln!(out, "Enter the vector {name}")?;
    out.flush()?;

    let what = format!("vector {name}");
    for elm in values.iter_mut() {
        let token = input.expect_token(&what)?;
        *elm = token.parse().map_err(|_| VecError::Parse {
            token,
            what: what.clone(),
        })?;
    }
    Ok(())
}

/// Print the first and last `PREVIEW_LEN` elements of a vector.
pub fn write_preview<W: Write + ?Sized>(
    out: &mut W,
    name: &str,
    values: &[f64],
) -> Result<(), VecError> {
    let head = &values[..values.len().min(PREVIEW_LEN)];
    let tail = &values[values.len().saturating_sub(PREVIEW_LEN)..];
    vector::write_vector(out, &format!("Vector {name} (first {PREVIEW_LEN}):"), head)?;
    vector::write_vector(out, &format!("Vector {name} (last {PREVIEW_LEN}):"), tail)?;
    Ok(())
}

/// Run the serial program: obtain `x` and `y`, add them, and print a
/// preview of all three vectors with the execution time.
///
/// The timed region excludes waiting on `input`. Interactive runs time the
/// addition alone; generated runs also time allocation and filling.
pub fn run_serial<R: BufRead, W: Write + ?Sized>(
    config: &SerialConfig,
    input: R,
    out: &mut W,
) -> Result<LocalVectors, VecError> {
    let mut input = TokenReader::new(input);

    let n = if config.interactive {
        read_order(&mut input, out)?
    } else if config.order == 0 {
        return Err(VecError::InvalidOrder);
    } else {
        config.order
    };

    let (mut vectors, start) = if config.interactive {
        let mut vectors = LocalVectors::allocate(n)?;
        read_vector(&mut input, out, &mut vectors.x, "x")?;
        read_vector(&mut input, out, &mut vectors.y, "y")?;
        (vectors, Instant::now())
    } else {
        let start = Instant::now();
        let mut vectors = LocalVectors::allocate(n)?;
        let mut rng = StdRng::seed_from_u64(vector::seed_for_rank(0));
        vector::fill_random(&mut rng, &mut vectors.x);
        vector::fill_random(&mut rng, &mut vectors.y);
        (vectors, start)
    };

    vector::vector_sum(&vectors.x, &vectors.y, &mut vectors.z)?;
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
    info!("added vectors of order {n}");

    write_preview(out, "x", &vectors.x)?;
    write_preview(out, "y", &vectors.y)?;
    write_preview(out, "z", &vectors.z)?;
    writeln!(out, "Execution Time (ms): {elapsed:.6}")?;

    Ok(vectors)
}
