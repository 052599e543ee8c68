//! Content expansion for "infinite scroll" listings
//!
//! A listing is expanded one step at a time until its measured size stops
//! growing for a number of consecutive steps, or a step budget runs out.

use async_trait::async_trait;

/// Something that can be grown one step at a time and measured
#[async_trait]
pub trait Expandable: Send {
    type Error: std::fmt::Display + Send;

    /// Performs one expansion step and returns the new size
    async fn expand(&mut self) -> Result<usize, Self::Error>;
}

/// How an expansion run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionOutcome {
    /// Steps performed
    pub steps: u32,
    /// Size after the last successful step
    pub size: usize,
    /// True when the run stopped because the size settled
    pub settled: bool,
}

/// Expands `target` until `stable_rounds` consecutive steps show no growth
///
/// At most `max_steps` steps are made. A failing step ends the run with the
/// size reached so far; the failure is logged, not returned.
pub async fn expand_until_stable<T: Expandable>(
    target: &mut T,
    initial_size: usize,
    max_steps: u32,
    stable_rounds: u32,
) -> ExpansionOutcome {
    let mut size = initial_size;
    let mut unchanged = 0;
    let mut steps = 0;

    while steps < max_steps && unchanged < stable_rounds {
        let measured = match target.expand().await {
            Ok(measured) => measured,
            Err(e) => {
                tracing::debug!("Expansion stopped after {} steps: {}", steps, e);
                break;
            }
        };
        steps += 1;

        if measured == size {
            unchanged += 1;
        } else {
            unchanged = 0;
            size = measured;
        }
    }

    ExpansionOutcome {
        steps,
        size,
        settled: unchanged >= stable_rounds,
    }
}
