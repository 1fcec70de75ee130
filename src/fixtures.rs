//! Small environments shared by the unit tests.

use async_trait::async_trait;

use crate::env::{EnvError, Environment};
use crate::error::Error;
use crate::Params;

/// `reset() -> "ready"`, `step(action) -> "did {action}"`.
#[derive(Debug, Default)]
pub struct Echo {
    pub steps: u32,
}

#[derive(Debug, Params)]
pub struct Act {
    pub action: String,
}

#[async_trait]
impl Environment for Echo {
    type ResetArgs = ();
    type Observation = String;
    type StepArgs = Act;
    type StepResult = String;

    async fn reset(&mut self, _: ()) -> Result<String, Error> {
        self.steps = 0;
        Ok("ready".to_string())
    }

    async fn step(&mut self, args: Act) -> Result<String, Error> {
        if args.action == "explode" {
            return Err(EnvError::msg("exploded").into());
        }
        self.steps += 1;
        Ok(format!("did {}", args.action))
    }
}

/// Running total. `reset` reports how many steps the episode took.
#[derive(Debug, Default)]
pub struct Tally {
    total: i64,
    steps: u32,
}

#[derive(Debug, Params)]
pub struct Bump {
    #[param(default = 1)]
    pub by: i64,
}

#[async_trait]
impl Environment for Tally {
    type ResetArgs = ();
    type Observation = u32;
    type StepArgs = Bump;
    type StepResult = i64;

    async fn reset(&mut self, _: ()) -> Result<u32, Error> {
        let steps = self.steps;
        self.total = 0;
        self.steps = 0;
        Ok(steps)
    }

    async fn step(&mut self, args: Bump) -> Result<i64, Error> {
        self.total += args.by;
        self.steps += 1;
        Ok(self.total)
    }
}

/// Declares a parameter that collides with the injected session id.
#[derive(Debug, Default)]
pub struct Shout;

#[derive(Debug, Params)]
pub struct Collides {
    pub session_id: String,
}

#[async_trait]
impl Environment for Shout {
    type ResetArgs = ();
    type Observation = ();
    type StepArgs = Collides;
    type StepResult = String;

    async fn reset(&mut self, _: ()) -> Result<(), Error> {
        Ok(())
    }

    async fn step(&mut self, args: Collides) -> Result<String, Error> {
        Ok(args.session_id.to_uppercase())
    }
}
