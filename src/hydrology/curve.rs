//! Cubic Bezier segments for river rendering and length estimates.

use crate::math::Vec2;

/// One cubic Bezier segment: `from` heads toward `go_towards`, and `to` is
/// approached coming from `come_from`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Curve {
    pub from: Vec2,
    pub go_towards: Vec2,
    pub come_from: Vec2,
    pub to: Vec2,
}

impl Curve {
    pub fn new(from: Vec2, go_towards: Vec2, come_from: Vec2, to: Vec2) -> Self {
        Self {
            from,
            go_towards,
            come_from,
            to,
        }
    }

    /// Evaluate the curve at parameter t (0.0 to 1.0)
    pub fn point_on_curve(&self, t: f32) -> Vec2 {
        let mt = 1.0 - t;
        // B(t) = (1-t)^3*P0 + 3*(1-t)^2*t*P1 + 3*(1-t)*t^2*P2 + t^3*P3
        let w0 = mt * mt * mt;
        let w1 = 3.0 * mt * mt * t;
        let w2 = 3.0 * mt * t * t;
        let w3 = t * t * t;
        self.from * w0 + self.go_towards * w1 + self.come_from * w2 + self.to * w3
    }

    /// Unit tangent at parameter t. Degenerate curves fall back to the chord.
    pub fn direction_on_curve(&self, t: f32) -> Vec2 {
        let mt = 1.0 - t;
        let w0 = -3.0 * mt * mt;
        let w1 = 3.0 * mt * mt - 6.0 * mt * t;
        let w2 = 6.0 * mt * t - 3.0 * t * t;
        let w3 = 3.0 * t * t;
        let d = self.from * w0 + self.go_towards * w1 + self.come_from * w2 + self.to * w3;
        let dir = d.normalize();
        if dir == Vec2::ZERO {
            (self.to - self.from).normalize()
        } else {
            dir
        }
    }

    /// Cheap length estimate: the arc lies between the chord and the control
    /// polygon, so average the two.
    pub fn est_curve_length(&self) -> f32 {
        let chord = self.from.distance(&self.to);
        let polygon = self.from.distance(&self.go_towards)
            + self.go_towards.distance(&self.come_from)
            + self.come_from.distance(&self.to);
        (chord + polygon) / 2.0
    }
}
