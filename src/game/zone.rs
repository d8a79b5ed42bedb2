//! Target zone centered on the middle of the track.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Hit,
    Miss,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetZone {
    pub width: f64,
}

impl TargetZone {
    pub fn new(width: f64) -> Self {
        Self { width }
    }

    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    /// Strictly inside the zone. Landing exactly on an edge does not count.
    pub fn contains(&self, position: f64) -> bool {
        let h = self.half_width();
        position > -h && position < h
    }

    pub fn classify(&self, position: f64) -> Verdict {
        if self.contains(position) { Verdict::Hit } else { Verdict::Miss }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_are_misses() {
        let z = TargetZone::new(1.5);
        assert_eq!(z.classify(0.75), Verdict::Miss);
        assert_eq!(z.classify(-0.75), Verdict::Miss);
        assert_eq!(z.classify(0.7499), Verdict::Hit);
        assert_eq!(z.classify(-0.7499), Verdict::Hit);
        assert_eq!(z.classify(0.0), Verdict::Hit);
    }

    #[test]
    fn test_far_positions_miss() {
        let z = TargetZone::new(1.5);
        assert_eq!(z.classify(-4.0), Verdict::Miss);
        assert_eq!(z.classify(5.0), Verdict::Miss);
        assert_eq!(z.classify(f64::NAN), Verdict::Miss);
    }
}
