//! Terminal stand-ins for the alarm speaker.

use sarthi_escalation::{AudioError, AudioHandle, AudioPlayer};

/// Rings the terminal bell instead of playing a sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleAlarm;

struct ConsoleAlarmHandle;

impl AudioHandle for ConsoleAlarmHandle {
    fn stop(&mut self) {
        println!("[alarm] silenced");
    }
}

impl AudioPlayer for ConsoleAlarm {
    fn play(&self, looping: bool) -> Result<Box<dyn AudioHandle>, AudioError> {
        println!(
            "\x07[alarm] sounding{}",
            if looping { " (looping)" } else { "" }
        );
        Ok(Box::new(ConsoleAlarmHandle))
    }
}
