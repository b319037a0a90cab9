/// One entry of the probe event log.
///
/// Times are in seconds and the delay in milliseconds. A dropped probe has
/// neither an arrival time nor a delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeEvent {
    pub departure_time: f64,
    pub arrival_time: Option<f64>,
    pub delay: Option<f64>,
}

impl ProbeEvent {
    /// A probe that came back after `delay`.
    ///
    /// The arrival time is `departure_time + delay`, the two values added
    /// as they are.
    pub fn measured(departure_time: f64, delay: f64) -> Self {
        Self {
            departure_time,
            arrival_time: Some(departure_time + delay),
            delay: Some(delay),
        }
    }

    pub fn dropped(departure_time: f64) -> Self {
        Self {
            departure_time,
            arrival_time: None,
            delay: None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        self.delay.is_none()
    }
}
