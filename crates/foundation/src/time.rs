/// Engine time in seconds.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn from_millis(ms: u64) -> Self {
        Time(ms as f64 / 1000.0)
    }

    pub fn after_millis(self, ms: u64) -> Self {
        Time(self.0 + ms as f64 / 1000.0)
    }

    pub fn as_millis(self) -> f64 {
        self.0 * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn millis_arithmetic() {
        let t = Time::from_millis(1500);
        assert_eq!(t, Time(1.5));
        assert_eq!(t.after_millis(250), Time(1.75));
        assert_eq!(Time(0.5).as_millis(), 500.0);
        assert!(Time::ZERO < t);
    }
}
