//! # 几何计算模块
//!
//! ## 设计思路
//!
//! 纯计算，不做任何 I/O：给定解码后的尺寸与方向码，得出输出尺寸与绘制变换。
//! 变换按画布语义描述（每一步右乘到当前矩阵），与绘制阶段解耦，可脱离任何图像后端单测。
//!
//! ## 实现思路
//!
//! 1. 方向 5–8 先交换宽高，再计算缩放比例（永不放大）
//! 2. 按方向码生成平移 / 旋转 / 镜像序列
//! 3. 序列合成为整数仿射矩阵（旋转只取 90° 的整数倍，结果精确）
//! 4. 绘制矩形为未交换的源尺寸（按同一比例缩放）

use super::orientation::OrientationCode;
use super::ImageError;

/// 像素尺寸，宽高均大于 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidInput(format!(
                "图片尺寸无效：{}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    pub fn longest_side(self) -> u32 {
        self.width.max(self.height)
    }

    pub fn aspect_ratio(self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// 旋转角度，只支持 90° 的整数倍。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarterTurn {
    /// +90°（画布坐标系中为顺时针）。
    Cw90,
    /// 180°。
    Half,
    /// −90°。
    Ccw90,
}

impl QuarterTurn {
    /// `(cos, sin)`
    fn cos_sin(self) -> (i64, i64) {
        match self {
            Self::Cw90 => (0, 1),
            Self::Half => (-1, 0),
            Self::Ccw90 => (0, -1),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Cw90 => 90,
            Self::Half => 180,
            Self::Ccw90 => -90,
        }
    }
}

/// 镜像轴。`Horizontal` 对应 `scale(-1, 1)`，`Vertical` 对应 `scale(1, -1)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorAxis {
    Horizontal,
    Vertical,
}

/// 单步画布变换。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp {
    Translate { dx: i64, dy: i64 },
    Rotate(QuarterTurn),
    Mirror(MirrorAxis),
}

/// 2D 仿射矩阵，画布约定：
///
/// ```text
/// x' = a·x + c·y + e
/// y' = b·x + d·y + f
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affine {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
    pub e: i64,
    pub f: i64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1,
        b: 0,
        c: 0,
        d: 1,
        e: 0,
        f: 0,
    };

    fn from_op(op: DrawOp) -> Self {
        match op {
            DrawOp::Translate { dx, dy } => Self {
                e: dx,
                f: dy,
                ..Self::IDENTITY
            },
            DrawOp::Rotate(turn) => {
                let (cos, sin) = turn.cos_sin();
                Self {
                    a: cos,
                    b: sin,
                    c: -sin,
                    d: cos,
                    e: 0,
                    f: 0,
                }
            }
            DrawOp::Mirror(MirrorAxis::Horizontal) => Self {
                a: -1,
                ..Self::IDENTITY
            },
            DrawOp::Mirror(MirrorAxis::Vertical) => Self {
                d: -1,
                ..Self::IDENTITY
            },
        }
    }

    /// `self × other`：先应用 `other`，再应用 `self`（画布的右乘语义）。
    pub fn then(self, other: Affine) -> Affine {
        Affine {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn determinant(self) -> i64 {
        self.a * self.d - self.b * self.c
    }

    /// 逆矩阵。方向变换的行列式恒为 ±1，因此逆矩阵仍为整数矩阵。
    pub fn inverse(self) -> Option<Affine> {
        let det = self.determinant();
        if det != 1 && det != -1 {
            return None;
        }

        let a = self.d * det;
        let b = -self.b * det;
        let c = -self.c * det;
        let d = self.a * det;

        Some(Affine {
            a,
            b,
            c,
            d,
            e: -(a * self.e + c * self.f),
            f: -(b * self.e + d * self.f),
        })
    }

    pub fn apply(self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a as f64 * x + self.c as f64 * y + self.e as f64,
            self.b as f64 * x + self.d as f64 * y + self.f as f64,
        )
    }
}

/// 撤销方向码所需的绘制变换序列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformPlan {
    orientation: OrientationCode,
    ops: Vec<DrawOp>,
}

impl TransformPlan {
    /// `output` 为交换、缩放之后的输出尺寸。
    pub fn for_orientation(orientation: OrientationCode, output: Dimensions) -> Self {
        let w = output.width as i64;
        let h = output.height as i64;

        use DrawOp::{Mirror, Rotate, Translate};
        let ops = match orientation {
            OrientationCode::Normal => vec![],
            OrientationCode::MirrorHorizontal => {
                vec![Translate { dx: w, dy: 0 }, Mirror(MirrorAxis::Horizontal)]
            }
            OrientationCode::Rotate180 => {
                vec![Translate { dx: w, dy: h }, Rotate(QuarterTurn::Half)]
            }
            OrientationCode::MirrorVertical => {
                vec![Translate { dx: 0, dy: h }, Mirror(MirrorAxis::Vertical)]
            }
            OrientationCode::Transpose => {
                vec![Rotate(QuarterTurn::Cw90), Mirror(MirrorAxis::Vertical)]
            }
            OrientationCode::Rotate90 => {
                vec![Rotate(QuarterTurn::Cw90), Translate { dx: 0, dy: -w }]
            }
            OrientationCode::Transverse => vec![
                Rotate(QuarterTurn::Cw90),
                Translate { dx: h, dy: -w },
                Mirror(MirrorAxis::Horizontal),
            ],
            OrientationCode::Rotate270 => {
                vec![Rotate(QuarterTurn::Ccw90), Translate { dx: -h, dy: 0 }]
            }
        };

        Self { orientation, ops }
    }

    pub fn orientation(&self) -> OrientationCode {
        self.orientation
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn rotation(&self) -> Option<QuarterTurn> {
        self.ops.iter().find_map(|op| match op {
            DrawOp::Rotate(turn) => Some(*turn),
            _ => None,
        })
    }

    pub fn mirror(&self) -> Option<MirrorAxis> {
        self.ops.iter().find_map(|op| match op {
            DrawOp::Mirror(axis) => Some(*axis),
            _ => None,
        })
    }

    /// 按调用顺序合成的总矩阵。
    pub fn matrix(&self) -> Affine {
        self.ops
            .iter()
            .fold(Affine::IDENTITY, |acc, op| acc.then(Affine::from_op(*op)))
    }
}

/// 纯计算阶段的完整输出。
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    /// 解码后的原始尺寸。
    pub source: Dimensions,
    /// 输出画布尺寸（方向已纠正、已缩放）。
    pub output: Dimensions,
    /// 源图在变换后坐标系中的绘制尺寸（未交换）。
    pub draw: Dimensions,
    pub scale: f64,
    pub transform: TransformPlan,
}

impl RenderPlan {
    /// 无需任何像素变换：方向正常且尺寸不变。
    pub fn is_passthrough(&self) -> bool {
        self.transform.is_identity() && self.output == self.source
    }
}

/// 计算方向纠正后的输出尺寸与绘制变换。
pub fn normalize(
    source: Dimensions,
    orientation: OrientationCode,
    max_dimension: u32,
) -> Result<RenderPlan, ImageError> {
    if max_dimension == 0 {
        return Err(ImageError::InvalidInput("max_dimension 不能为 0".to_string()));
    }
    // `Dimensions` 的字段是公开的，这里再次确认非零。
    let source = Dimensions::new(source.width, source.height)?;

    let target = if orientation.swaps_axes() {
        source.swapped()
    } else {
        source
    };

    let max = max_dimension as f64;
    let scale = (max / target.width as f64)
        .min(max / target.height as f64)
        .min(1.0);

    let output = Dimensions {
        width: scale_side(target.width, scale, max_dimension),
        height: scale_side(target.height, scale, max_dimension),
    };

    let draw = if orientation.swaps_axes() {
        output.swapped()
    } else {
        output
    };

    Ok(RenderPlan {
        source,
        output,
        draw,
        scale,
        transform: TransformPlan::for_orientation(orientation, output),
    })
}

fn scale_side(side: u32, scale: f64, max_dimension: u32) -> u32 {
    ((side as f64 * scale).round() as u32).clamp(1, max_dimension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions::new(width, height).expect("non-zero dimensions")
    }

    fn corners(width: u32, height: u32) -> Vec<(i64, i64)> {
        let (w, h) = (width as i64, height as i64);
        let mut points = vec![(0, 0), (w, 0), (0, h), (w, h)];
        points.sort();
        points
    }

    #[test]
    fn rotated_photo_is_swapped_then_scaled() {
        let plan = normalize(dims(4000, 3000), OrientationCode::Rotate90, 2048)
            .expect("plan should build");

        assert_eq!(plan.output, dims(1536, 2048));
        assert_eq!(plan.draw, dims(2048, 1536));
        assert_eq!(plan.transform.rotation(), Some(QuarterTurn::Cw90));
        assert_eq!(plan.transform.orientation(), OrientationCode::Rotate90);
        assert_eq!(plan.transform.rotation().map(QuarterTurn::degrees), Some(90));
        assert!((plan.output.aspect_ratio() - dims(3000, 4000).aspect_ratio()).abs() < 1e-9);
    }

    #[test]
    fn single_pixel_stays_single_pixel() {
        for code in OrientationCode::ALL {
            let plan = normalize(dims(1, 1), code, 2048).expect("plan should build");
            assert_eq!(plan.output, dims(1, 1));
            assert_eq!(plan.scale, 1.0);
        }
    }

    #[test]
    fn upright_small_image_is_passthrough() {
        let plan = normalize(dims(800, 600), OrientationCode::Normal, 2048)
            .expect("plan should build");

        assert!(plan.is_passthrough());
        assert_eq!(plan.output, dims(800, 600));
    }

    #[test]
    fn zero_area_is_rejected() {
        let zero = Dimensions { width: 0, height: 10 };
        assert!(matches!(
            normalize(zero, OrientationCode::Normal, 2048),
            Err(ImageError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize(dims(10, 10), OrientationCode::Normal, 0),
            Err(ImageError::InvalidInput(_))
        ));
    }

    #[test]
    fn extreme_aspect_keeps_short_side_at_least_one() {
        let plan = normalize(dims(100_000, 10), OrientationCode::Normal, 2048)
            .expect("plan should build");
        assert_eq!(plan.output, dims(2048, 1));
    }

    #[test]
    fn transform_table_matches_canvas_sequence() {
        let out = dims(30, 20);
        let expectations: [(OrientationCode, Option<QuarterTurn>, Option<MirrorAxis>); 8] = [
            (OrientationCode::Normal, None, None),
            (OrientationCode::MirrorHorizontal, None, Some(MirrorAxis::Horizontal)),
            (OrientationCode::Rotate180, Some(QuarterTurn::Half), None),
            (OrientationCode::MirrorVertical, None, Some(MirrorAxis::Vertical)),
            (OrientationCode::Transpose, Some(QuarterTurn::Cw90), Some(MirrorAxis::Vertical)),
            (OrientationCode::Rotate90, Some(QuarterTurn::Cw90), None),
            (OrientationCode::Transverse, Some(QuarterTurn::Cw90), Some(MirrorAxis::Horizontal)),
            (OrientationCode::Rotate270, Some(QuarterTurn::Ccw90), None),
        ];

        for (code, rotation, mirror) in expectations {
            let plan = TransformPlan::for_orientation(code, out);
            assert_eq!(plan.rotation(), rotation, "{:?}", code);
            assert_eq!(plan.mirror(), mirror, "{:?}", code);
            assert_eq!(plan.orientation(), code);
        }

        let rot90 = TransformPlan::for_orientation(OrientationCode::Rotate90, out);
        assert_eq!(
            rot90.ops(),
            &[
                DrawOp::Rotate(QuarterTurn::Cw90),
                DrawOp::Translate { dx: 0, dy: -30 }
            ]
        );
    }

    #[test]
    fn every_transform_maps_draw_rect_onto_output() {
        for code in OrientationCode::ALL {
            let plan = normalize(dims(300, 200), code, 2048).expect("plan should build");
            let matrix = plan.transform.matrix();

            let mut mapped: Vec<(i64, i64)> = corners(plan.draw.width, plan.draw.height)
                .into_iter()
                .map(|(x, y)| {
                    let (mx, my) = matrix.apply(x as f64, y as f64);
                    (mx as i64, my as i64)
                })
                .collect();
            mapped.sort();

            assert_eq!(
                mapped,
                corners(plan.output.width, plan.output.height),
                "{:?}",
                code
            );
        }
    }

    #[test]
    fn rotate90_moves_origin_to_top_right() {
        let out = dims(3, 2);
        let matrix = TransformPlan::for_orientation(OrientationCode::Rotate90, out).matrix();
        assert_eq!(matrix.apply(0.0, 0.0), (3.0, 0.0));

        let matrix = TransformPlan::for_orientation(OrientationCode::Rotate270, out).matrix();
        assert_eq!(matrix.apply(0.0, 0.0), (0.0, 2.0));

        let matrix = TransformPlan::for_orientation(OrientationCode::Transpose, out).matrix();
        assert_eq!(matrix.apply(1.0, 2.0), (2.0, 1.0));
    }

    #[test]
    fn inverse_round_trips() {
        for code in OrientationCode::ALL {
            let matrix = TransformPlan::for_orientation(code, dims(17, 9)).matrix();
            let inverse = matrix.inverse().expect("orientation transforms are invertible");
            assert_eq!(matrix.then(inverse), Affine::IDENTITY, "{:?}", code);
            assert_eq!(inverse.then(matrix), Affine::IDENTITY, "{:?}", code);
        }
    }

    proptest! {
        #[test]
        fn output_never_exceeds_cap_or_upscales(
            width in 1u32..20_000,
            height in 1u32..20_000,
            code_index in 0usize..8,
        ) {
            let code = OrientationCode::ALL[code_index];
            let plan = normalize(dims(width, height), code, 2048).expect("plan should build");

            prop_assert!(plan.output.longest_side() <= 2048);
            prop_assert!(plan.scale <= 1.0);
            prop_assert!(plan.output.pixel_count() <= plan.source.pixel_count());
        }

        #[test]
        fn output_keeps_corrected_aspect(
            width in 1u32..20_000,
            height in 1u32..20_000,
            code_index in 0usize..8,
        ) {
            let code = OrientationCode::ALL[code_index];
            let source = dims(width, height);
            let plan = normalize(source, code, 2048).expect("plan should build");

            let corrected = if code.swaps_axes() { source.swapped() } else { source };
            let ideal_w = corrected.width as f64 * plan.scale;
            let ideal_h = corrected.height as f64 * plan.scale;

            // 两轴使用同一比例，仅有取整误差（短边最少为 1）。
            prop_assert!((plan.output.width as f64 - ideal_w.max(1.0)).abs() <= 0.5 + 1e-9);
            prop_assert!((plan.output.height as f64 - ideal_h.max(1.0)).abs() <= 0.5 + 1e-9);
            prop_assert_eq!(plan.draw, if code.swaps_axes() { plan.output.swapped() } else { plan.output });
        }
    }
}
