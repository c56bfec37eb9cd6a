//! LED channel identifiers and the per-channel container [`Rgb`].

use std::fmt;

/// One of the three emitters of the tri-color LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Led {
    Red,
    Green,
    Blue,
}

impl Led {
    /// All LEDs in capture order (the rig cycles red, green, blue).
    pub const ALL: [Led; 3] = [Led::Red, Led::Green, Led::Blue];

    /// Single-letter label used in tabular column names (`R`, `G`, `B`).
    pub fn letter(self) -> char {
        match self {
            Led::Red => 'R',
            Led::Green => 'G',
            Led::Blue => 'B',
        }
    }

    /// Lower-case name used in emitted C identifiers.
    pub fn name(self) -> &'static str {
        match self {
            Led::Red => "red",
            Led::Green => "green",
            Led::Blue => "blue",
        }
    }
}

impl fmt::Display for Led {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A value per LED channel.
///
/// Used for drive currents, PWM duties and exact currents alike so that
/// per-channel code can be written once and indexed by [`Led`].
///
/// # Example
///
/// ```
/// use led_lut::{Led, Rgb};
///
/// let drive = Rgb::new(12u8, 4, 30);
/// assert_eq!(drive[Led::Blue], 30);
/// assert_eq!(drive.map(|v| v * 2), Rgb::new(24, 8, 60));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb<T> {
    pub r: T,
    pub g: T,
    pub b: T,
}

impl<T> Rgb<T> {
    #[inline]
    pub const fn new(r: T, g: T, b: T) -> Self {
        Self { r, g, b }
    }

    /// Build a value by evaluating `f` for each LED in capture order.
    pub fn from_fn(mut f: impl FnMut(Led) -> T) -> Self {
        let r = f(Led::Red);
        let g = f(Led::Green);
        let b = f(Led::Blue);
        Self { r, g, b }
    }

    /// Apply `f` to every channel.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Rgb<U> {
        Rgb {
            r: f(self.r),
            g: f(self.g),
            b: f(self.b),
        }
    }

    /// Apply `f` to a reference to every channel.
    pub fn map_ref<U>(&self, mut f: impl FnMut(&T) -> U) -> Rgb<U> {
        Rgb {
            r: f(&self.r),
            g: f(&self.g),
            b: f(&self.b),
        }
    }

    /// Try to build a value per LED, stopping at the first error.
    pub fn try_from_fn<E>(mut f: impl FnMut(Led) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            r: f(Led::Red)?,
            g: f(Led::Green)?,
            b: f(Led::Blue)?,
        })
    }
}

impl<T> std::ops::Index<Led> for Rgb<T> {
    type Output = T;

    fn index(&self, led: Led) -> &T {
        match led {
            Led::Red => &self.r,
            Led::Green => &self.g,
            Led::Blue => &self.b,
        }
    }
}

impl<T> std::ops::IndexMut<Led> for Rgb<T> {
    fn index_mut(&mut self, led: Led) -> &mut T {
        match led {
            Led::Red => &mut self.r,
            Led::Green => &mut self.g,
            Led::Blue => &mut self.b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led_letters() {
        let letters: String = Led::ALL.iter().map(|l| l.letter()).collect();
        assert_eq!(letters, "RGB");
        assert_eq!(Led::Green.to_string(), "G");
        assert_eq!(Led::Blue.name(), "blue");
    }

    #[test]
    fn test_rgb_index_and_from_fn() {
        let mut v = Rgb::from_fn(|led| led.letter());
        assert_eq!(v, Rgb::new('R', 'G', 'B'));

        v[Led::Green] = 'x';
        assert_eq!(v[Led::Green], 'x');
        assert_eq!(v[Led::Red], 'R');
    }

    #[test]
    fn test_integer_rgb_is_hashable() {
        let set: std::collections::HashSet<Rgb<u8>> =
            [Rgb::new(1, 2, 3), Rgb::new(1, 2, 3), Rgb::new(3, 2, 1)]
                .into_iter()
                .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_try_from_fn_stops_on_error() {
        let mut calls = 0;
        let result: Result<Rgb<u8>, Led> = Rgb::try_from_fn(|led| {
            calls += 1;
            if led == Led::Green {
                Err(led)
            } else {
                Ok(1)
            }
        });
        assert_eq!(result, Err(Led::Green));
        assert_eq!(calls, 2);
    }
}
