use std::f32::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};

/// Sun height below which time runs at the night speed.
const NIGHT_FAST_FORWARD_BELOW: f32 = -0.1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySettings {
    /// Seconds in a full day at normal speed.
    pub day_length: f32,
    pub night_speedup: f32,
    /// Fraction of the day the world starts at. 0.5 is noon.
    pub start_fraction: f32,
}

impl Default for DaySettings {
    fn default() -> Self {
        Self {
            day_length: 900.0,
            night_speedup: 3.0,
            start_fraction: 0.5,
        }
    }
}

/// Game clock driving the sun. Lighting only ever sees [`DayCycle::sun_height`].
#[derive(Clone, Debug)]
pub struct DayCycle {
    time: f32,
    days_elapsed: u32,
    settings: DaySettings,
}

impl DayCycle {
    pub fn new(settings: DaySettings) -> Self {
        let day_length = settings.day_length.max(f32::EPSILON);
        let time = settings.start_fraction.rem_euclid(1.0) * day_length;
        Self {
            time,
            days_elapsed: 0,
            settings: DaySettings {
                day_length,
                ..settings
            },
        }
    }

    /// Advances the clock. Returns true when a day rolled over.
    pub fn advance(&mut self, dt: f32) -> bool {
        let speed = if self.sun_height() < NIGHT_FAST_FORWARD_BELOW {
            self.settings.night_speedup
        } else {
            1.0
        };
        self.time += dt.max(0.0) * speed;

        let mut rolled = false;
        while self.time >= self.settings.day_length {
            self.time -= self.settings.day_length;
            self.days_elapsed += 1;
            rolled = true;
        }
        rolled
    }

    pub fn fraction(&self) -> f32 {
        self.time / self.settings.day_length
    }

    pub fn set_fraction(&mut self, fraction: f32) {
        self.time = fraction.rem_euclid(1.0) * self.settings.day_length;
    }

    /// Midnight at fraction 0, sunrise at 0.25, noon at 0.5.
    pub fn sun_angle(&self) -> f32 {
        self.fraction() * TAU - FRAC_PI_2
    }

    /// Sine of the sun angle: 1 at noon, -1 at midnight.
    pub fn sun_height(&self) -> f32 {
        self.sun_angle().sin()
    }

    pub fn is_night(&self) -> bool {
        self.sun_height() < 0.0
    }

    pub fn days_elapsed(&self) -> u32 {
        self.days_elapsed
    }
}

impl Default for DayCycle {
    fn default() -> Self {
        Self::new(DaySettings::default())
    }
}
