//! Whitespace-separated pixel image I/O (§6 Input/Output file format).
//!
//! Neither H nor W is declared up front; this resolves the §9 open
//! question by scanning the file: H is the number of non-blank lines, W is
//! the token count of the first non-blank line, and every subsequent row
//! is checked against it.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{DenoiserError, Result};
use crate::matrix::Matrix;

pub fn read_image(path: &Path) -> Result<Matrix<i8>> {
    let file = File::open(path)?;
    read_image_from(BufReader::new(file))
}

pub fn read_image_from<R: Read>(buf: BufReader<R>) -> Result<Matrix<i8>> {
    let mut rows: Vec<Vec<i8>> = Vec::new();
    let mut expected_cols: Option<usize> = None;

    for (idx, line) in buf.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut row = Vec::with_capacity(expected_cols.unwrap_or(0));
        for token in line.split_whitespace() {
            let value: i32 = token
                .parse()
                .map_err(|source| DenoiserError::Parse { line: line_no, source })?;
            if value != 1 && value != -1 {
                return Err(DenoiserError::InvalidPixel {
                    row: rows.len(),
                    col: row.len(),
                    value,
                });
            }
            row.push(value as i8);
        }

        let cols = *expected_cols.get_or_insert(row.len());
        if row.len() != cols {
            return Err(DenoiserError::RaggedRow {
                line: line_no,
                expected: cols,
                found: row.len(),
            });
        }
        rows.push(row);
    }

    let height = rows.len();
    let width = expected_cols.unwrap_or(0);
    let mut image = Matrix::new_default(height, width, 0_i8);
    for (r, row) in rows.into_iter().enumerate() {
        for (c, value) in row.into_iter().enumerate() {
            image[(r, c)] = value;
        }
    }
    Ok(image)
}

pub fn write_image(path: &Path, image: &Matrix<i8>) -> Result<()> {
    let mut out = String::with_capacity(image.rows * (image.cols * 3 + 1));
    for r in 0..image.rows {
        let row = image.row(r);
        for (i, pixel) in row.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&pixel.to_string());
        }
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}
