use crate::parallel;
use rigcal_image::{ImageError, Map2};

/// Create a pair of coordinate maps by evaluating `f(x, y)` on every grid cell.
///
/// Rows are evaluated in parallel.
///
/// # Arguments
///
/// * `cols` - The number of columns indicating the width of the grid
/// * `rows` - The number of rows indicating the height of the grid
/// * `f` - Returns the `(x, y)` map values for column `x` and row `y`
///
/// # Errors
///
/// If either dimension is zero or the grid is too large to allocate.
pub fn meshgrid_from_fn(
    cols: usize,
    rows: usize,
    f: impl Fn(usize, usize) -> (f32, f32) + Send + Sync,
) -> Result<(Map2<f32>, Map2<f32>), ImageError> {
    if cols == 0 || rows == 0 {
        return Err(ImageError::EmptyImageSize(cols, rows));
    }

    let len = rows
        .checked_mul(cols)
        .ok_or(ImageError::ImageSizeOverflow(cols, rows))?;
    let mut map_x = vec![0.0f32; len];
    let mut map_y = vec![0.0f32; len];

    parallel::par_fill_rows_two(cols, &mut map_x, &mut map_y, |y, xs, ys| {
        for (x, (mx, my)) in xs.iter_mut().zip(ys.iter_mut()).enumerate() {
            let (vx, vy) = f(x, y);
            *mx = vx;
            *my = vy;
        }
    });

    let map_x = Map2::from_shape_vec([rows, cols], map_x)?;
    let map_y = Map2::from_shape_vec([rows, cols], map_y)?;

    Ok((map_x, map_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_grid() -> Result<(), ImageError> {
        let (map_x, map_y) = meshgrid_from_fn(3, 2, |x, y| (x as f32, y as f32))?;
        assert_eq!(map_x.shape, [2, 3]);
        assert_eq!(map_x.as_slice(), &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(map_y.as_slice(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_meshgrid_empty() {
        assert_eq!(
            meshgrid_from_fn(0, 4, |x, y| (x as f32, y as f32)),
            Err(ImageError::EmptyImageSize(0, 4))
        );
    }

    #[test]
    fn test_meshgrid_overflow() {
        assert_eq!(
            meshgrid_from_fn(usize::MAX, 2, |x, y| (x as f32, y as f32)),
            Err(ImageError::ImageSizeOverflow(usize::MAX, 2))
        );
    }
}
