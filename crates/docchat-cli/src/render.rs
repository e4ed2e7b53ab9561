//! Turns chat events into terminal lines.

use std::io::{self, Write};

use chrono::{DateTime, FixedOffset};
use docchat_core::session::Message;
use docchat_core::{ChatEvent, Sender};
use tokio::sync::broadcast::{self, error::TryRecvError};

pub const UPLOAD_HINT: &str = "Upload a .pdf or .txt file to begin: /upload <path>";

pub struct Renderer<W: Write> {
    events: broadcast::Receiver<ChatEvent>,
    out: W,
    /// Offset message times are shown in.
    offset: FixedOffset,
}

impl<W: Write> Renderer<W> {
    pub fn new(events: broadcast::Receiver<ChatEvent>, out: W, offset: FixedOffset) -> Self {
        Self {
            events,
            out,
            offset,
        }
    }

    /// Render every event committed so far.
    pub fn drain(&mut self) -> io::Result<()> {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.render(&event)?,
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Renderer lagged, skipped {} events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        self.out.flush()
    }

    pub fn transcript(&mut self, messages: &[Message]) -> io::Result<()> {
        if messages.is_empty() {
            writeln!(self.out, "(no messages)")?;
        }
        for message in messages {
            self.message(message)?;
        }
        self.out.flush()
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    fn render(&mut self, event: &ChatEvent) -> io::Result<()> {
        match event {
            // The user just typed it; no need to echo.
            ChatEvent::MessageAppended(message) if message.sender == Sender::User => Ok(()),
            ChatEvent::MessageAppended(message) => self.message(message),
            ChatEvent::HistoryReset(messages) if messages.is_empty() => {
                writeln!(self.out, "-- conversation cleared --")
            }
            ChatEvent::HistoryReset(messages) => {
                for message in messages {
                    self.message(message)?;
                }
                Ok(())
            }
            ChatEvent::TypingChanged(true) => writeln!(self.out, "(agent is typing...)"),
            ChatEvent::TypingChanged(false) => Ok(()),
            ChatEvent::GateChanged(true) => Ok(()),
            ChatEvent::GateChanged(false) => writeln!(self.out, "{UPLOAD_HINT}"),
        }
    }

    fn message(&mut self, message: &Message) -> io::Result<()> {
        let time = self.clock_time(message.timestamp);
        writeln!(
            self.out,
            "[{time}] {:>5}> {}",
            message.sender.to_string(),
            message.text
        )
    }

    fn clock_time(&self, timestamp_ms: i64) -> String {
        match DateTime::from_timestamp_millis(timestamp_ms) {
            Some(utc) => utc.with_timezone(&self.offset).format("%H:%M:%S").to_string(),
            None => "--:--:--".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::session::{MessageClock, MessageKind};
    use docchat_core::EventBus;

    // 2023-11-14T22:13:20Z
    const TS: i64 = 1_700_000_000_000;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn message(sender: Sender, text: &str) -> Message {
        Message {
            id: format!("{sender}-test"),
            text: text.to_string(),
            sender,
            timestamp: TS,
        }
    }

    fn renderer(bus: &EventBus) -> Renderer<Vec<u8>> {
        Renderer::new(bus.subscribe(), Vec::new(), utc())
    }

    fn rendered(events: &[ChatEvent]) -> String {
        let bus = EventBus::new();
        let mut renderer = renderer(&bus);
        for event in events {
            bus.emit(event.clone());
        }
        renderer.drain().unwrap();
        String::from_utf8(renderer.out).unwrap()
    }

    #[test]
    fn agent_messages_are_printed_user_messages_are_not() {
        let output = rendered(&[
            ChatEvent::MessageAppended(message(Sender::User, "question")),
            ChatEvent::TypingChanged(true),
            ChatEvent::MessageAppended(message(Sender::Agent, "answer")),
            ChatEvent::TypingChanged(false),
        ]);

        assert_eq!(output, "(agent is typing...)\n[22:13:20] agent> answer\n");
    }

    #[test]
    fn reset_prints_announcement_or_cleared_marker() {
        let mut clock = MessageClock::new();
        let announcement = clock.upload_announcement("report.pdf");

        let output = rendered(&[
            ChatEvent::HistoryReset(vec![announcement]),
            ChatEvent::GateChanged(true),
            ChatEvent::HistoryReset(vec![]),
        ]);

        assert!(output.contains("agent> ✅ File \"report.pdf\" uploaded successfully!"));
        assert!(output.ends_with("-- conversation cleared --\n"));
    }

    #[test]
    fn closing_gate_prints_upload_hint() {
        let output = rendered(&[ChatEvent::GateChanged(false)]);
        assert_eq!(output, format!("{UPLOAD_HINT}\n"));
    }

    #[test]
    fn transcript_pads_sender_names() {
        let bus = EventBus::new();
        let mut renderer = renderer(&bus);

        renderer
            .transcript(&[message(Sender::User, "hi"), message(Sender::Agent, "hello")])
            .unwrap();

        let output = String::from_utf8(renderer.out).unwrap();
        assert_eq!(output, "[22:13:20]  user> hi\n[22:13:20] agent> hello\n");
    }

    #[test]
    fn times_follow_the_display_offset() {
        let bus = EventBus::new();
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let mut renderer = Renderer::new(bus.subscribe(), Vec::new(), cest);

        renderer.transcript(&[message(Sender::Agent, "hello")]).unwrap();

        let output = String::from_utf8(renderer.out).unwrap();
        assert_eq!(output, "[00:13:20] agent> hello\n");
    }

    #[test]
    fn minted_messages_get_a_clock_time() {
        let mut clock = MessageClock::new();
        let output = rendered(&[ChatEvent::MessageAppended(
            clock.mint(MessageKind::Agent, "now"),
        )]);

        // [HH:MM:SS] agent> now
        assert_eq!(&output[0..1], "[");
        assert_eq!(&output[9..11], "] ");
        assert!(output.ends_with("agent> now\n"));
    }

    #[test]
    fn empty_transcript_says_so() {
        let bus = EventBus::new();
        let mut renderer = renderer(&bus);
        renderer.transcript(&[]).unwrap();
        assert_eq!(String::from_utf8(renderer.out).unwrap(), "(no messages)\n");
    }
}
