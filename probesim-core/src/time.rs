use anyhow::{Result, anyhow, bail, ensure};
use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time};

/// A [`std::time::Duration`] that can be written the way humans do.
///
/// Used to configure traffic runs (`"10s"`, `"1s 500ms"`, `"250us"`).
/// Every component is a whole number followed by its unit; components
/// are summed.
///
/// ```
/// # use probesim_core::HumanDuration;
/// # use std::time::Duration;
/// let duration: HumanDuration = "1s 500ms".parse().unwrap();
/// assert_eq!(duration.into_duration(), Duration::from_millis(1_500));
/// assert_eq!(duration.to_string(), "1.5s");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HumanDuration(time::Duration);

impl HumanDuration {
    pub const fn new(dur: time::Duration) -> Self {
        Self(dur)
    }

    #[inline]
    pub fn into_duration(self) -> time::Duration {
        self.0
    }
}

impl From<time::Duration> for HumanDuration {
    fn from(value: time::Duration) -> Self {
        Self::new(value)
    }
}

impl From<HumanDuration> for time::Duration {
    fn from(value: HumanDuration) -> Self {
        value.into_duration()
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

impl FromStr for HumanDuration {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::new(s);

        let mut total = time::Duration::ZERO;
        let mut components = 0usize;

        while let Some(next) = lex.next() {
            let number: Token = next.map_err(|()| anyhow!("Failed to parse: {s}"))?;

            ensure!(
                number == Token::Value,
                "Expecting duration to starts with number. Cannot parse {s}"
            );
            let number: u64 = lex.slice().parse()?;

            let Some(Ok(measure)) = lex.next() else {
                bail!("Expecting a measure, failed to parse: {s}")
            };
            let duration = match measure {
                Token::NanoSeconds => time::Duration::from_nanos(number),
                Token::MicroSeconds => time::Duration::from_micros(number),
                Token::MilliSeconds => time::Duration::from_millis(number),
                Token::Seconds => time::Duration::from_secs(number),
                Token::Minutes => time::Duration::from_secs(number * 60),
                Token::Value => bail!("Failed to parse `{s}', expecting a measure."),
            };
            total += duration;
            components += 1;
        }

        ensure!(components > 0, "Empty duration: `{s}'");

        Ok(Self(total))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,

    #[regex("[0-9]+")]
    Value,
}
