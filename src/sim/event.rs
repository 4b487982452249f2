/// Events emitted during a simulation step.
/// The presentation layer consumes these for status text and logging.

use crate::domain::interaction::ContactCause;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LifeLossCause {
    EnemyHead,
    PipeContact,
    TimeUp,
}

impl From<ContactCause> for LifeLossCause {
    fn from(c: ContactCause) -> Self {
        match c {
            ContactCause::EnemyHead => LifeLossCause::EnemyHead,
            ContactCause::PipeContact => LifeLossCause::PipeContact,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PelletCollected { x: i32, y: i32 },
    AllPelletsCollected,
    EnemyDestroyed { id: usize, x: f32, y: f32 },
    LifeLost { cause: LifeLossCause },
    RetractStarted,
    RetractStopped,
    Docked,
    LevelComplete { bonus: u32 },
    GameOver,
}
