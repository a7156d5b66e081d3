use crate::parallel;

use super::{interpolate_pixel, InterpolationMode};
use rigcal_image::{Image, ImageError, Map2};

/// Apply generic geometric transformation to an image.
///
/// # Arguments
///
/// * `src` - The input image container with shape (height, width, C).
/// * `dst` - The output image container with shape (height, width, C).
/// * `map_x` - The x coordinates of the pixels to interpolate.
/// * `map_y` - The y coordinates of the pixels to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// Pixels whose map entry falls outside `src` are set to zero.
///
/// # Errors
///
/// * The mapx and mapy must have the same size.
/// * The output image must have the same size as the mapx and mapy.
pub fn remap<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    map_x: &Map2<f32>,
    map_y: &Map2<f32>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    if map_x.shape != map_y.shape {
        return Err(ImageError::InvalidImageSize(
            map_x.shape[0],
            map_x.shape[1],
            map_y.shape[0],
            map_y.shape[1],
        ));
    }

    if dst.size() != map_x.size() {
        return Err(ImageError::InvalidImageSize(
            dst.rows(),
            dst.cols(),
            map_x.rows(),
            map_x.cols(),
        ));
    }

    if src.size().is_empty() {
        return Err(ImageError::EmptyImageSize(src.cols(), src.rows()));
    }

    // parallelize the remap operation by rows
    parallel::par_iter_rows_resample(dst, map_x, map_y, |&x, &y, dst_pixel| {
        dst_pixel.iter_mut().enumerate().for_each(|(c, pixel)| {
            *pixel = interpolate_pixel(src, x, y, c, interpolation, 0.0);
        });
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::grid::meshgrid_from_fn;
    use rigcal_image::ImageSize;

    fn identity(rows: usize, cols: usize) -> Result<(Map2<f32>, Map2<f32>), ImageError> {
        meshgrid_from_fn(cols, rows, |x, y| (x as f32, y as f32))
    }

    #[test]
    fn remap_smoke() -> Result<(), ImageError> {
        let image = Image::<_, 1>::new(
            ImageSize {
                width: 3,
                height: 3,
            },
            vec![0f32, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        )?;

        let new_size = [2, 2];

        let map_x = Map2::from_shape_vec(new_size, vec![0.0, 2.0, 0.0, 2.0])?;
        let map_y = Map2::from_shape_vec(new_size, vec![0.0, 0.0, 2.0, 2.0])?;

        let mut image_transformed = Image::<_, 1>::from_size_val(map_x.size(), 0.0)?;

        remap(
            &image,
            &mut image_transformed,
            &map_x,
            &map_y,
            InterpolationMode::Bilinear,
        )?;

        assert_eq!(image_transformed.as_slice(), &[0.0, 2.0, 6.0, 8.0]);

        Ok(())
    }

    #[test]
    fn remap_identity_and_border() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 3,
        };
        let data = (0..12).map(|v| v as f32).collect::<Vec<_>>();
        let image = Image::<_, 1>::new(size, data.clone())?;

        let (map_x, mut map_y) = identity(3, 4)?;
        let mut out = Image::<_, 1>::from_size_val(size, 0.0)?;
        remap(&image, &mut out, &map_x, &map_y, InterpolationMode::Nearest)?;
        assert_eq!(out.as_slice(), data.as_slice());

        // invalid samples fall back to the border value
        map_y.as_slice_mut()[1] = -1.0;
        remap(&image, &mut out, &map_x, &map_y, InterpolationMode::Bilinear)?;
        assert_eq!(out.as_slice()[1], 0.0);
        assert_eq!(out.as_slice()[5], 5.0);

        Ok(())
    }

    #[test]
    fn remap_size_mismatch() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::from_size_val(ImageSize::from([2, 2]), 0.0)?;
        let (map_x, map_y) = identity(2, 2)?;
        let mut out = Image::<f32, 1>::from_size_val(ImageSize::from([3, 2]), 0.0)?;
        assert!(remap(&image, &mut out, &map_x, &map_y, InterpolationMode::Bilinear).is_err());
        Ok(())
    }
}
