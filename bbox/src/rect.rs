use crate::common::*;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    fn from_tlbr(tlbr: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlbr(tlbr).unwrap()
    }

    fn from_tlhw(tlhw: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlhw(tlhw).unwrap()
    }

    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    /// The corners in `[x1, y1, x2, y2]` order.
    fn xyxy(&self) -> [Self::Type; 4] {
        [self.l(), self.t(), self.r(), self.b()]
    }
}

/// Rectangles on a pixel grid where both corners are inclusive.
///
/// A box spanning `l..=r` covers `r - l + 1` pixels, so a box with `l == r`
/// still has unit width.
pub trait RectPixel: RectNum
where
    Self::Type: Float,
{
    fn pixel_h(&self) -> Self::Type {
        self.h() + Self::Type::one()
    }

    fn pixel_w(&self) -> Self::Type {
        self.w() + Self::Type::one()
    }

    fn pixel_area(&self) -> Self::Type {
        self.pixel_h() * self.pixel_w()
    }

    fn pixel_intersection_area_with<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        let zero = Self::Type::zero();
        let one = Self::Type::one();
        let ih = (self.b().min(other.b()) - self.t().max(other.t()) + one).max(zero);
        let iw = (self.r().min(other.r()) - self.l().max(other.l()) + one).max(zero);
        ih * iw
    }

    fn pixel_iou_with<R>(&self, other: &R) -> Self::Type
    where
        R: RectPixel<Type = Self::Type>,
    {
        let inter_area = self.pixel_intersection_area_with(other);
        let union_area = self.pixel_area() + other.pixel_area() - inter_area;
        inter_area / union_area
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}

impl<T> RectPixel for T
where
    T: Rect,
    T::Type: Float,
{
}
