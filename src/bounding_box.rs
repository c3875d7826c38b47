use derive_more::{Add, Display, Div, Mul, Sub};
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr};

/// 二维点 / 向量
#[derive(Debug, Clone, Copy, PartialEq, Add, Sub, Mul, Div, Display, Serialize, Deserialize)]
#[display(fmt = "({}, {})", x, y)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// 点积
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 二维叉积（结果向量的 z 分量）
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// 向量长度
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// 线段，由起点和终点组成
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Segment { start, end }
    }

    /// 判断两个点是否位于线段所在直线的两侧（落在直线上也算）
    fn divides(&self, p1: Point, p2: Point) -> bool {
        let direction = self.end - self.start;
        let z1 = direction.cross(p1 - self.end);
        let z2 = direction.cross(p2 - self.end);
        z1.min(z2) <= 0.0 && z1.max(z2) >= 0.0
    }

    /// 判断两条线段是否相交
    pub fn intersects(&self, other: &Segment) -> bool {
        self.divides(other.start, other.end) && other.divides(self.start, self.end)
    }

    /// 计算点到线段的距离
    ///
    /// 如果点的投影落在线段之外（与两个端点向量的点积同号），取到较近端点的距离；
    /// 否则取垂直距离：叉积的绝对值除以线段长度。
    pub fn distance_to(&self, p: Point) -> f64 {
        let segment_vector = self.end - self.start;
        let a_to_point = p - self.start;
        let b_to_point = p - self.end;

        let length = segment_vector.length();
        if length == 0.0 {
            // 退化线段
            return a_to_point.length();
        }

        let scalar_a = segment_vector.dot(a_to_point);
        let scalar_b = segment_vector.dot(b_to_point);

        if (scalar_a < 0.0 && scalar_b < 0.0) || (scalar_a > 0.0 && scalar_b > 0.0) {
            if scalar_a.abs() < scalar_b.abs() {
                a_to_point.length()
            } else {
                b_to_point.length()
            }
        } else {
            let unit = segment_vector / length;
            unit.cross(a_to_point).abs()
        }
    }
}

/// 轴对齐边界框
///
/// 要么是空框（并集中被吸收，不与任何框相交，到任何框的距离为 0），
/// 要么由一个角点 (x, y) 和带符号的宽高 (w, h) 描述。
///
/// 相等比较要求两个框都非空且 (x, y, w, h) 完全一致，因此 `Empty != Empty`。
///
/// 运算符沿用 `&` 表示并集、`|` 表示交集。
#[derive(Debug, Clone, Copy, Default, Display, Serialize, Deserialize)]
pub enum BoundingBox {
    #[default]
    #[display(fmt = "(empty)")]
    Empty,
    #[display(fmt = "({}, {}, {}, {})", x, y, w, h)]
    Rect { x: f64, y: f64, w: f64, h: f64 },
}

impl BoundingBox {
    /// 创建新的边界框
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        BoundingBox::Rect { x, y, w, h }
    }

    /// 创建空边界框
    pub const fn empty() -> Self {
        BoundingBox::Empty
    }

    /// 由左下角和右上角构造边界框
    pub fn from_corners(bl: Point, tr: Point) -> Self {
        BoundingBox::new(bl.x, bl.y, tr.x - bl.x, tr.y - bl.y)
    }

    /// 判断是否为空框
    pub fn is_empty(&self) -> bool {
        matches!(self, BoundingBox::Empty)
    }

    /// 规范化后的左下角
    pub fn bl(&self) -> Option<Point> {
        match *self {
            BoundingBox::Empty => None,
            BoundingBox::Rect { x, y, w, h } => Some(Point::new(x.min(x + w), y.min(y + h))),
        }
    }

    /// 规范化后的右上角
    pub fn tr(&self) -> Option<Point> {
        match *self {
            BoundingBox::Empty => None,
            BoundingBox::Rect { x, y, w, h } => Some(Point::new(x.max(x + w), y.max(y + h))),
        }
    }

    /// 中心点
    pub fn center(&self) -> Option<Point> {
        match *self {
            BoundingBox::Empty => None,
            BoundingBox::Rect { x, y, w, h } => Some(Point::new(x + w / 2.0, y + h / 2.0)),
        }
    }

    /// 面积，等于 w * h；空框面积为 0
    ///
    /// 宽高为负时符号没有意义，不要依赖。
    pub fn area(&self) -> f64 {
        match *self {
            BoundingBox::Empty => 0.0,
            BoundingBox::Rect { w, h, .. } => w * h,
        }
    }

    /// 四条边（按原始角点和方向生成，逆时针）
    fn sides(&self) -> Option<[Segment; 4]> {
        match *self {
            BoundingBox::Empty => None,
            BoundingBox::Rect { x, y, w, h } => Some([
                Segment::new(Point::new(x, y), Point::new(x + w, y)),
                Segment::new(Point::new(x + w, y), Point::new(x + w, y + h)),
                Segment::new(Point::new(x + w, y + h), Point::new(x, y + h)),
                Segment::new(Point::new(x, y + h), Point::new(x, y)),
            ]),
        }
    }

    /// 并集：覆盖两个框的最小边界框，空框被吸收
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        match (self.bl().zip(self.tr()), other.bl().zip(other.tr())) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((bl1, tr1)), Some((bl2, tr2))) => BoundingBox::from_corners(
                Point::new(bl1.x.min(bl2.x), bl1.y.min(bl2.y)),
                Point::new(tr1.x.max(tr2.x), tr1.y.max(tr2.y)),
            ),
        }
    }

    /// 交集：重叠区域；任一为空或不接触时返回空框
    ///
    /// 仅边界接触时返回退化（面积为 0）的框。
    pub fn intersection(&self, other: &BoundingBox) -> BoundingBox {
        if !self.intersects(other) {
            return BoundingBox::Empty;
        }
        match (self.bl().zip(self.tr()), other.bl().zip(other.tr())) {
            (Some((bl1, tr1)), Some((bl2, tr2))) => BoundingBox::from_corners(
                Point::new(bl1.x.max(bl2.x), bl1.y.max(bl2.y)),
                Point::new(tr1.x.min(tr2.x), tr1.y.min(tr2.y)),
            ),
            _ => BoundingBox::Empty,
        }
    }

    /// 判断两个框是否相交（边界接触也算相交）
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let (Some(bl1), Some(tr1), Some(bl2), Some(tr2)) =
            (self.bl(), self.tr(), other.bl(), other.tr())
        else {
            return false;
        };
        bl1.x.max(bl2.x) <= tr1.x.min(tr2.x) && bl1.y.max(bl2.y) <= tr1.y.min(tr2.y)
    }

    /// 判断 `other` 是否完全落在当前框内：`self & other == self`
    ///
    /// 注意这是非对称的包含测试，并不是一般意义的重叠。
    ///
    /// 按并集相等来判定：`other` 为空框时并集不变，结果为 `true`（非空框包含空框）；
    /// `self` 为空框时永远为 `false`。树中存储和查询的框都不为空，
    /// 所以前一种情况不会影响删除时的下降和 `find_contained`。
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.union(other) == *self
    }

    /// 按规范化角点做带容差的比较，两个空框视为相等
    ///
    /// 增量并集和完整重算得到的 (x, w) 可能相差一个舍入误差，检查不变量时用它代替 `==`。
    pub fn approx_eq(&self, other: &BoundingBox, epsilon: f64) -> bool {
        match (self.bl().zip(self.tr()), other.bl().zip(other.tr())) {
            (None, None) => true,
            (Some((bl1, tr1)), Some((bl2, tr2))) => {
                (bl1 - bl2).length() <= epsilon && (tr1 - tr2).length() <= epsilon
            }
            _ => false,
        }
    }

    /// 计算扩大到包含另一个框所需的面积增量
    pub fn enlargement(&self, other: &BoundingBox) -> f64 {
        self.union(other).area() - self.area()
    }

    /// 两个框之间的近似最短距离
    ///
    /// 相交或任一为空时为 0。否则用连接两个中心的线段找出它穿过的两条边，
    /// 取两条边端点到对方边的四个距离中的最小值。
    /// 只用于分裂时挑选种子，结果是确定的但并不精确。
    pub fn distance(&self, other: &BoundingBox) -> f64 {
        if self.intersects(other) {
            return 0.0;
        }
        let (Some(c1), Some(c2), Some(sides1), Some(sides2)) =
            (self.center(), other.center(), self.sides(), other.sides())
        else {
            return 0.0;
        };

        let connector = Segment::new(c1, c2);
        let crossing1 = sides1.iter().find(|side| side.intersects(&connector));
        let crossing2 = sides2.iter().find(|side| side.intersects(&connector));
        let (Some(s1), Some(s2)) = (crossing1, crossing2) else {
            // 中心连线必然穿出两个不相交的框，走到这里说明数值退化
            return (c2 - c1).length();
        };

        [
            s2.distance_to(s1.start),
            s2.distance_to(s1.end),
            s1.distance_to(s2.start),
            s1.distance_to(s2.end),
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
    }
}

impl PartialEq for BoundingBox {
    fn eq(&self, other: &BoundingBox) -> bool {
        match (self, other) {
            (
                BoundingBox::Rect { x, y, w, h },
                BoundingBox::Rect { x: ox, y: oy, w: ow, h: oh },
            ) => x == ox && y == oy && w == ow && h == oh,
            _ => false,
        }
    }
}

impl BitAnd for BoundingBox {
    type Output = BoundingBox;

    fn bitand(self, rhs: BoundingBox) -> BoundingBox {
        self.union(&rhs)
    }
}

impl BitOr for BoundingBox {
    type Output = BoundingBox;

    fn bitor(self, rhs: BoundingBox) -> BoundingBox {
        self.intersection(&rhs)
    }
}
