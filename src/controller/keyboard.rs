// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::audio::Voice;
use crate::controls::Control;

const TABLA: &str = "tabla";
const T1: &str = "t1";
const T2: &str = "t2";
const STOP: &str = "stop";
const STYLE: &str = "style";
const TABLA_TEMPO: &str = "tabla-tempo";
const TEMPO: &str = "tempo";
const TUNE: &str = "tune";
const VOLUME: &str = "volume";
const PAN1: &str = "pan1";
const PAN2: &str = "pan2";
const BAYAN: &str = "bayan";
const KEY: &str = "key";
const T1_NOTES: &str = "t1-notes";
const T2_NOTES: &str = "t2-notes";
const STATUS: &str = "status";

const COMMANDS: [&str; 16] = [
    TABLA,
    T1,
    T2,
    STOP,
    STYLE,
    TABLA_TEMPO,
    TEMPO,
    TUNE,
    VOLUME,
    PAN1,
    PAN2,
    BAYAN,
    KEY,
    T1_NOTES,
    T2_NOTES,
    STATUS,
];

pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Parses one command line such as `tabla-tempo 120` or `t1-notes 7 none`.
    fn parse(input: &str) -> Result<Event, Box<dyn Error>> {
        let mut words = input.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let mut arg = || words.next().ok_or_else(|| format!("{} needs a value", command));

        let event = match command.as_str() {
            TABLA => Event::ToggleTabla,
            T1 => Event::ToggleVoice(Voice::One),
            T2 => Event::ToggleVoice(Voice::Two),
            STOP => Event::Stop,
            STATUS => Event::Status,
            STYLE => Event::Style(arg()?.parse()?),
            KEY => Event::Key(arg()?.parse()?),
            TABLA_TEMPO => Event::Control(Control::TablaTempo(arg()?.parse()?)),
            TEMPO => Event::Control(Control::MelodyTempo(arg()?.parse()?)),
            TUNE => Event::Control(Control::Tune(arg()?.parse()?)),
            VOLUME => Event::Control(Control::Volume(arg()?.parse()?)),
            PAN1 => Event::Control(Control::Pan(Voice::One, arg()?.parse()?)),
            PAN2 => Event::Control(Control::Pan(Voice::Two, arg()?.parse()?)),
            BAYAN => Event::Control(Control::BayanVolume(arg()?.parse()?)),
            T1_NOTES => Event::Offsets(Voice::One, [arg()?.parse()?, arg()?.parse()?]),
            T2_NOTES => Event::Offsets(Voice::Two, [arg()?.parse()?, arg()?.parse()?]),
            _ => return Err(format!("unrecognized command: {}", command).into()),
        };
        Ok(event)
    }

    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<(), io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "Command ({}): ", COMMANDS.join(", "))?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }

        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }
        match Self::parse(input) {
            Ok(event) => events_tx
                .blocking_send(event)
                .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e.to_string())),
            Err(e) => {
                warn!(input, err = %e, "Unrecognized input");
                Ok(())
            }
        }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            loop {
                match Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout()) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        info!("Input closed, keyboard driver exiting.");
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader, BufWriter};

    use tokio::sync::mpsc;

    use super::*;
    use crate::melody::{Offset, PitchClass};
    use crate::tabla::Style;

    fn get_event(event: &str) -> Result<Option<Event>, io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);

        let reader_bytes = format!("{}\n", event);
        let reader = BufReader::new(reader_bytes.as_bytes());

        let writer_bytes: Vec<u8> = vec![0; 255];
        let writer = BufWriter::new(writer_bytes);
        Driver::monitor_io(&sender, reader, writer)?;

        // Force the sender to close.
        drop(sender);
        Ok(receiver.blocking_recv())
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!(Some(Event::ToggleTabla), get_event(TABLA)?);
        assert_eq!(Some(Event::ToggleVoice(Voice::One)), get_event(T1)?);
        assert_eq!(Some(Event::ToggleVoice(Voice::Two)), get_event("T2")?);
        assert_eq!(Some(Event::Stop), get_event(STOP)?);
        assert_eq!(Some(Event::Status), get_event(STATUS)?);
        assert_eq!(Some(Event::Style(Style::Roopak)), get_event("style roopak")?);
        assert_eq!(Some(Event::Key(PitchClass::ASharp)), get_event("key A#")?);
        assert_eq!(
            Some(Event::Control(Control::TablaTempo(120))),
            get_event("tabla-tempo 120")?
        );
        assert_eq!(
            Some(Event::Control(Control::MelodyTempo(90))),
            get_event("tempo 90")?
        );
        assert_eq!(
            Some(Event::Control(Control::Tune(-15.0))),
            get_event("tune -15")?
        );
        assert_eq!(
            Some(Event::Control(Control::Volume(-6.5))),
            get_event("volume -6.5")?
        );
        assert_eq!(
            Some(Event::Control(Control::Pan(Voice::Two, 0.25))),
            get_event("pan2 0.25")?
        );
        assert_eq!(
            Some(Event::Control(Control::BayanVolume(3.0))),
            get_event("bayan 3")?
        );
        assert_eq!(
            Some(Event::Offsets(
                Voice::One,
                [Offset::semitones(7), Offset::REST]
            )),
            get_event("t1-notes 7 none")?
        );
        Ok(())
    }

    #[test]
    fn test_bad_input() -> Result<(), io::Error> {
        assert_eq!(None, get_event("unrecognized")?);
        assert_eq!(None, get_event("")?);
        assert_eq!(None, get_event("style waltz")?);
        assert_eq!(None, get_event("tempo")?);
        assert_eq!(None, get_event("tempo fast")?);
        assert_eq!(None, get_event("t2-notes 5")?);
        Ok(())
    }

    #[test]
    fn test_closed_input() {
        let (sender, _receiver) = mpsc::channel::<Event>(1);
        let result = Driver::monitor_io(&sender, BufReader::new("".as_bytes()), io::sink());
        assert!(matches!(result, Err(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }
}
