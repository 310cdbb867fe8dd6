//! External coordinator (§4.6): partitions the image into a worker grid,
//! dispatches each tile, and later assembles the final image from the
//! workers' results. Runs on the coordinator rank only; never touches a
//! worker's `Tile`.

use crate::cli::GridShape;
use crate::direction::{Direction, Rank, ABSENT};
use crate::error::{DenoiserError, Result};
use crate::matrix::Matrix;
use crate::transport::{Payload, Tag, Transport};

/// Rank assigned to grid cell `(gr, gc)` in an `R x C` grid (§4.6).
pub fn worker_rank(gr: usize, gc: usize, cols: usize) -> Rank {
    1 + (gr * cols + gc) as Rank
}

/// The rank a neighbour in direction `d` from `(gr, gc)` would have, or
/// `None` if that neighbour falls outside the `rows x cols` grid.
fn neighbour_rank(gr: usize, gc: usize, rows: usize, cols: usize, d: Direction) -> Option<Rank> {
    let (dr, dc) = d.delta();
    let nr = gr as isize + dr;
    let nc = gc as isize + dc;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        None
    } else {
        Some(worker_rank(nr as usize, nc as usize, cols))
    }
}

/// Sends every worker its tile dimensions, neighbour table and image rows
/// (§4.6, second bullet). Fails with [`DenoiserError::Config`] if the image
/// does not partition evenly into the requested grid.
pub fn dispatch<T: Transport>(transport: &T, image: &Matrix<i8>, grid: GridShape) -> Result<()> {
    if image.rows % grid.rows != 0 || image.cols % grid.cols != 0 {
        return Err(DenoiserError::Config(format!(
            "image {}x{} does not divide evenly into a {}x{} grid",
            image.rows, image.cols, grid.rows, grid.cols
        )));
    }
    let tile_rows = image.rows / grid.rows;
    let tile_cols = image.cols / grid.cols;

    for gr in 0..grid.rows {
        for gc in 0..grid.cols {
            let rank = worker_rank(gr, gc, grid.cols);

            transport.send(rank, Tag::Rows, Payload::Int(tile_rows as i32));
            transport.send(rank, Tag::Columns, Payload::Int(tile_cols as i32));

            for d in Direction::ALL {
                let neighbour = neighbour_rank(gr, gc, grid.rows, grid.cols, d).unwrap_or(ABSENT);
                transport.send(rank, Tag::Direction(d), Payload::Int(neighbour));
            }

            for i in 0..tile_rows {
                let source_row = gr * tile_rows + i;
                let row = image.row(source_row)[gc * tile_cols..(gc + 1) * tile_cols].to_vec();
                transport.send(rank, Tag::ImageRow(i), Payload::Row(row));
            }
        }
    }
    Ok(())
}

/// Receives every worker's final tile and assembles the denoised image
/// (§4.6, third bullet).
pub fn collect<T: Transport>(transport: &T, image_rows: usize, image_cols: usize, grid: GridShape) -> Result<Matrix<i8>> {
    let tile_rows = image_rows / grid.rows;
    let tile_cols = image_cols / grid.cols;
    let mut assembled = Matrix::new_default(image_rows, image_cols, 0_i8);

    for gr in 0..grid.rows {
        for gc in 0..grid.cols {
            let rank = worker_rank(gr, gc, grid.cols);
            for i in 0..tile_rows {
                let row = transport
                    .post_recv(rank, Tag::FinalImageRow(i))
                    .wait()
                    .into_row()?;
                let dest_row = gr * tile_rows + i;
                for (j, value) in row.into_iter().enumerate() {
                    assembled[(dest_row, gc * tile_cols + j)] = value;
                }
            }
        }
    }
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fabric::Network;

    #[test]
    fn rejects_grid_that_does_not_divide_image() {
        let net = Network::new();
        let coordinator = net.handle(0);
        let image = Matrix::new_default(3, 4, 1_i8);
        let err = dispatch(&coordinator, &image, GridShape { rows: 2, cols: 2 }).unwrap_err();
        assert!(matches!(err, DenoiserError::Config(_)));
    }

    #[test]
    fn dispatches_rows_columns_neighbours_and_pixels() {
        let net = Network::new();
        let coordinator = net.handle(0);
        let grid = GridShape { rows: 1, cols: 2 };
        let mut image = Matrix::new_default(2, 4, 1_i8);
        image[(0, 2)] = -1;

        dispatch(&coordinator, &image, grid).unwrap();

        let worker_a = net.handle(worker_rank(0, 0, 2));
        assert_eq!(2, worker_a.post_recv(0, Tag::Rows).wait().into_int().unwrap());
        assert_eq!(2, worker_a.post_recv(0, Tag::Columns).wait().into_int().unwrap());
        assert_eq!(
            worker_rank(0, 1, 2),
            worker_a.post_recv(0, Tag::Direction(Direction::Right)).wait().into_int().unwrap()
        );
        assert_eq!(
            ABSENT,
            worker_a.post_recv(0, Tag::Direction(Direction::Left)).wait().into_int().unwrap()
        );
        assert_eq!(vec![1, 1], worker_a.post_recv(0, Tag::ImageRow(0)).wait().into_row().unwrap());

        let worker_b = net.handle(worker_rank(0, 1, 2));
        assert_eq!(vec![-1, 1], worker_b.post_recv(0, Tag::ImageRow(0)).wait().into_row().unwrap());
    }

    #[test]
    fn collect_assembles_tiles_back_into_the_full_image() {
        let net = Network::new();
        let coordinator = net.handle(0);
        let grid = GridShape { rows: 1, cols: 2 };

        let worker_a = net.handle(worker_rank(0, 0, 2));
        let worker_b = net.handle(worker_rank(0, 1, 2));
        worker_a.send(0, Tag::FinalImageRow(0), Payload::Row(vec![1, 1]));
        worker_a.send(0, Tag::FinalImageRow(1), Payload::Row(vec![-1, -1]));
        worker_b.send(0, Tag::FinalImageRow(0), Payload::Row(vec![1, -1]));
        worker_b.send(0, Tag::FinalImageRow(1), Payload::Row(vec![1, 1]));

        let image = collect(&coordinator, 2, 4, grid).unwrap();
        assert_eq!(vec![1, 1, 1, -1], image.row(0).to_vec());
        assert_eq!(vec![-1, -1, 1, 1], image.row(1).to_vec());
    }
}
