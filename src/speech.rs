//! Announcement scheduling over a single speech channel.
//!
//! At most one utterance is in flight. A new announcement always stops the
//! current one first, so stale instructions never queue behind fresh ones.
//! Announcements that cannot be spoken are dropped, never retried.

use log::{debug, warn};

use crate::config::VoiceSettings;
use crate::error::GuidanceError;

pub type UtteranceId = u64;

/// Text plus voice parameters handed to the speech engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub voice: String,
    pub rate: f32,
    pub volume: f32,
    pub pitch: f32,
}

/// Host speech synthesis engine.
pub trait SpeechChannel: Send {
    fn speak(&mut self, utterance: &Utterance);
    /// Stop the current utterance immediately.
    fn stop_speaking(&mut self);
    /// False when the device is in a constrained power state or the engine
    /// failed to initialise.
    fn is_available(&self) -> bool;
}

/// Progress reports from the speech channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechSignal {
    Started(UtteranceId),
    Finished(UtteranceId),
    Cancelled(UtteranceId),
    Failed { id: UtteranceId, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    VoiceDisabled,
    ServiceUnavailable,
    EmptyText,
}

/// Outcome of [`AnnouncementScheduler::announce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Spoken(UtteranceId),
    Dropped(DropReason),
}

pub struct AnnouncementScheduler {
    channel: Box<dyn SpeechChannel>,
    settings: VoiceSettings,
    next_id: UtteranceId,
    in_flight: Option<UtteranceId>,
    speaking: bool,
}

impl AnnouncementScheduler {
    pub fn new(channel: Box<dyn SpeechChannel>, settings: VoiceSettings) -> Self {
        Self {
            channel,
            settings,
            next_id: 1,
            in_flight: None,
            speaking: false,
        }
    }

    pub fn set_voice_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
        if !enabled {
            self.silence();
        }
    }

    pub fn voice_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Informational only; new announcements interrupt regardless.
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> Option<UtteranceId> {
        self.in_flight
    }

    /// Speak `text`, interrupting whatever is in flight.
    pub fn announce(&mut self, text: &str) -> Announcement {
        if text.trim().is_empty() {
            return Announcement::Dropped(DropReason::EmptyText);
        }
        if !self.settings.enabled {
            debug!("voice disabled, dropping announcement: {text}");
            return Announcement::Dropped(DropReason::VoiceDisabled);
        }
        if !self.channel.is_available() {
            warn!("speech service unavailable, dropping announcement: {text}");
            return Announcement::Dropped(DropReason::ServiceUnavailable);
        }

        if let Some(previous) = self.in_flight.take() {
            debug!("interrupting utterance {previous}");
            self.channel.stop_speaking();
            self.speaking = false;
        }

        let id = self.next_id;
        self.next_id += 1;
        let utterance = Utterance {
            id,
            text: text.to_string(),
            voice: self.settings.voice.clone(),
            rate: self.settings.rate,
            volume: self.settings.volume,
            pitch: self.settings.pitch,
        };
        debug!("speaking utterance {id}: {text}");
        self.channel.speak(&utterance);
        self.in_flight = Some(id);
        Announcement::Spoken(id)
    }

    /// Hard stop of any in-flight utterance.
    pub fn silence(&mut self) {
        if let Some(id) = self.in_flight.take() {
            debug!("silencing utterance {id}");
            self.channel.stop_speaking();
        }
        self.speaking = false;
    }

    /// Apply a channel signal. Signals for superseded utterances are ignored.
    pub fn handle_signal(&mut self, signal: SpeechSignal) -> Option<GuidanceError> {
        let id = match &signal {
            SpeechSignal::Started(id)
            | SpeechSignal::Finished(id)
            | SpeechSignal::Cancelled(id)
            | SpeechSignal::Failed { id, .. } => *id,
        };
        if self.in_flight != Some(id) {
            debug!("ignoring stale speech signal {signal:?}");
            return None;
        }

        match signal {
            SpeechSignal::Started(_) => {
                self.speaking = true;
                None
            }
            SpeechSignal::Finished(_) | SpeechSignal::Cancelled(_) => {
                self.in_flight = None;
                self.speaking = false;
                None
            }
            SpeechSignal::Failed { id, message } => {
                warn!("utterance {id} failed: {message}");
                self.in_flight = None;
                self.speaking = false;
                Some(GuidanceError::SpeechFailed { id, message })
            }
        }
    }
}
