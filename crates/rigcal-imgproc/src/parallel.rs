use rayon::prelude::*;

use rigcal_image::{Image, Map2};

/// Fill two equally shaped row-major buffers row by row in parallel.
///
/// `f(row, map_x_row, map_y_row)` receives one row of each buffer.
pub fn par_fill_rows_two<T1, T2>(
    cols: usize,
    dst1: &mut [T1],
    dst2: &mut [T2],
    f: impl Fn(usize, &mut [T1], &mut [T2]) + Send + Sync,
) where
    T1: Send,
    T2: Send,
{
    if cols == 0 {
        return;
    }
    dst1.par_chunks_exact_mut(cols)
        .zip(dst2.par_chunks_exact_mut(cols))
        .enumerate()
        .for_each(|(row, (chunk1, chunk2))| f(row, chunk1, chunk2));
}

/// Apply a function to each pixel for grid sampling in parallel.
pub fn par_iter_rows_resample<const C: usize>(
    dst: &mut Image<f32, C>,
    map_x: &Map2<f32>,
    map_y: &Map2<f32>,
    f: impl Fn(&f32, &f32, &mut [f32]) + Send + Sync,
) {
    let cols = dst.cols();
    if cols == 0 {
        return;
    }
    let dst_slice = dst.as_slice_mut();
    let map_x_slice = map_x.as_slice();
    let map_y_slice = map_y.as_slice();

    dst_slice
        .par_chunks_exact_mut(C * cols)
        .zip(map_x_slice.par_chunks_exact(cols))
        .zip(map_y_slice.par_chunks_exact(cols))
        .for_each(|((dst_chunk, map_x_chunk), map_y_chunk)| {
            dst_chunk
                .chunks_exact_mut(C)
                .zip(map_x_chunk.iter().zip(map_y_chunk.iter()))
                .for_each(|(dst_pixel, (x, y))| {
                    f(x, y, dst_pixel);
                });
        });
}
