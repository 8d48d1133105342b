use crate::{common::*, RectPixel, TLBR};

/// Dense inclusive-pixel IoU matrix between two box lists.
///
/// Entry `(i, j)` is the IoU of `boxes[i]` and `query[j]`. Either list may
/// be empty, producing a matrix with a zero-length axis.
pub fn pixel_overlaps<T>(boxes: &[TLBR<T>], query: &[TLBR<T>]) -> Array2<T>
where
    T: Float,
{
    Array2::from_shape_fn((boxes.len(), query.len()), |(i, j)| {
        boxes[i].pixel_iou_with(&query[j])
    })
}
