//! MatataLab bot peripherals, reached through the controller

pub mod emotion;
pub mod eyes;
pub mod motion;
pub mod music;

pub use emotion::{Action, Dance, Emotions};
pub use eyes::Eyes;
pub use motion::{BotMotion, Movement, Wheel};
pub use music::{Music, Sound};

use super::{CommandOptions, PeripheralError};
use crate::domain::settings::Settings;
use crate::infrastructure::link::CommandChannel;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const START_OPCODE: u8 = 0x85;

pub struct Bot {
    link: Arc<dyn CommandChannel>,
    start_timeout: Duration,
    pub motion: BotMotion,
    pub emotions: Emotions,
    pub music: Music,
    pub eyes: Eyes,
}

impl Bot {
    pub fn new(link: Arc<dyn CommandChannel>, settings: &Settings) -> Self {
        Self::with_options(
            link,
            CommandOptions::from(&settings.commands),
            settings.link.request_timeout(),
        )
    }

    pub fn with_options(
        link: Arc<dyn CommandChannel>,
        command: CommandOptions,
        start_timeout: Duration,
    ) -> Self {
        Self {
            motion: BotMotion::new(link.clone(), command),
            emotions: Emotions::new(link.clone(), command),
            music: Music::new(link.clone(), command),
            eyes: Eyes::new(link.clone(), command),
            link,
            start_timeout,
        }
    }

    /// Switch the controller into bot control; resolves once the controller echoes `0x85`
    pub async fn start(&self) -> Result<(), PeripheralError> {
        self.link
            .send_and_wait(START_OPCODE, &[], self.start_timeout)
            .await?;
        info!("Bot control started");
        Ok(())
    }
}
