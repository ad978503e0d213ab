use crate::grid::BoundingBox;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};

/// Bounding rectangles of the foreground blobs of a binary page
///
/// Only outer borders count, so holes inside a blob never produce boxes of
/// their own. Extents are inclusive: a blob spanning columns 10..=19 is 10 wide.
/// Boxes come back in contour discovery order (raster scan of blob starts).
pub fn detect_boxes(image: &GrayImage) -> Vec<BoundingBox> {
    let contours = find_contours::<i32>(image);

    let boxes: Vec<BoundingBox> = contours
        .iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .filter_map(|contour| {
            let min_x = contour.points.iter().map(|p| p.x).min()?;
            let max_x = contour.points.iter().map(|p| p.x).max()?;
            let min_y = contour.points.iter().map(|p| p.y).min()?;
            let max_y = contour.points.iter().map(|p| p.y).max()?;

            Some(BoundingBox {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            })
        })
        .collect();

    tracing::debug!(
        contours = contours.len(),
        boxes = boxes.len(),
        "Detected text blobs"
    );

    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use pretty_assertions::assert_eq;

    fn fill(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
        for py in y..y + h {
            for px in x..x + w {
                img.put_pixel(px, py, Luma([255]));
            }
        }
    }

    #[test]
    fn test_detects_each_blob_with_inclusive_extents() {
        let mut img = GrayImage::new(100, 60);
        fill(&mut img, 10, 5, 20, 8);
        fill(&mut img, 50, 30, 15, 12);

        let mut boxes = detect_boxes(&img);
        boxes.sort_by_key(|b| (b.x, b.y));

        assert_eq!(
            boxes,
            vec![
                BoundingBox {
                    x: 10,
                    y: 5,
                    width: 20,
                    height: 8
                },
                BoundingBox {
                    x: 50,
                    y: 30,
                    width: 15,
                    height: 12
                },
            ]
        );
    }

    #[test]
    fn test_hole_does_not_produce_a_box() {
        let mut img = GrayImage::new(40, 40);
        fill(&mut img, 5, 5, 30, 30);
        for py in 15..25 {
            for px in 15..25 {
                img.put_pixel(px, py, Luma([0]));
            }
        }

        let boxes = detect_boxes(&img);

        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].width, 30);
    }

    #[test]
    fn test_blank_page_has_no_boxes() {
        assert!(detect_boxes(&GrayImage::new(50, 50)).is_empty());
    }

    #[test]
    fn test_single_pixel_blob() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(4, 6, Luma([255]));

        let boxes = detect_boxes(&img);

        assert_eq!(
            boxes,
            vec![BoundingBox {
                x: 4,
                y: 6,
                width: 1,
                height: 1
            }]
        );
    }
}
