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
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Instrument, Level};

use crate::audio::{StemLoader, Voice};
use crate::controls::Control;
use crate::melody::{Offset, PitchClass};
use crate::session::Session;
use crate::tabla::Style;

pub mod keyboard;

#[derive(Debug, PartialEq)]
pub enum Event {
    /// Starts the tabla if it's stopped, stops it otherwise.
    ToggleTabla,

    /// Starts or stops a melodic loop.
    ToggleVoice(Voice),

    /// Stops the tabla and both melodic loops.
    Stop,

    /// Selects the taal used by the next tabla start.
    Style(Style),

    /// Changes the key of the melodic loops.
    Key(PitchClass),

    /// Changes the two offset notes of a melodic voice.
    Offsets(Voice, [Offset; 2]),

    /// Changes a continuous control.
    Control(Control),

    /// Reports the session status.
    Status,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller that drives the session from the given driver.
    pub fn new<L: StemLoader>(session: Session<L>, driver: Arc<dyn Driver>) -> Controller {
        let span = span!(Level::INFO, "controller");
        Controller {
            handle: tokio::spawn(Controller::trigger_events(session, driver).instrument(span)),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Drives the session from the driver's events. When the driver closes,
    /// everything is stopped.
    async fn trigger_events<L: StemLoader>(session: Session<L>, driver: Arc<dyn Driver>) {
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!(status = %session.status(), "Controller started.");

        while let Some(event) = events_rx.recv().await {
            info!(event = ?event, "Received event.");
            if let Err(e) = Controller::dispatch(&session, event) {
                error!(err = %e, "Error talking to session.");
            }
        }

        info!("Controller closing.");
        session.stop();
        match join_handle.await {
            Ok(Err(e)) => error!(err = %e, "Event monitor failed."),
            Err(e) => error!(err = %e, "Error waiting for event monitor to stop."),
            Ok(Ok(())) => {}
        }
    }

    /// Handles one event without waiting on stem loads, so a stop always gets
    /// through while a start or tempo change is still loading. The tabla
    /// engine logs load failures itself.
    fn dispatch<L: StemLoader>(session: &Session<L>, event: Event) -> Result<(), Box<dyn Error>> {
        match event {
            Event::ToggleTabla => drop(session.toggle_tabla()),
            Event::ToggleVoice(voice) => {
                let running = session.toggle_voice(voice);
                info!(%voice, running, "Melodic loop toggled.");
            }
            Event::Stop => session.stop(),
            Event::Style(style) => session.set_style(style),
            Event::Key(key) => session.set_key(key),
            Event::Offsets(voice, offsets) => session.set_offsets(voice, offsets),
            Event::Control(control) => {
                let label = session.apply(control)?;
                info!(%control, label = %label, "Control applied.");
            }
            Event::Status => info!(status = %session.status(), "Status."),
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{io, path::PathBuf, sync::Arc, time::Duration};

    use parking_lot::Mutex;
    use tokio::{sync::mpsc::Sender, task::JoinHandle, time::sleep};

    use super::{Controller, Driver, Event};
    use crate::audio::{
        mock::{self, Loader},
        MixSettings, Voice,
    };
    use crate::controls::Control;
    use crate::melody::{sequencer::Sequencer, sequencer::Settings, NoteBank, PitchClass};
    use crate::session::Session;
    use crate::tabla::{Options, Phase, Status, Style, TablaEngine};

    /// Sends a fixed script of events, pausing after each one, and then closes.
    struct ScriptDriver {
        script: Mutex<Vec<Event>>,
        pause: Duration,
    }

    impl ScriptDriver {
        fn new(script: Vec<Event>, pause: Duration) -> Arc<ScriptDriver> {
            Arc::new(ScriptDriver {
                script: Mutex::new(script),
                pause,
            })
        }
    }

    impl Driver for ScriptDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let script = std::mem::take(&mut *self.script.lock());
            let pause = self.pause;
            tokio::spawn(async move {
                for event in script {
                    events_tx
                        .send(event)
                        .await
                        .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e.to_string()))?;
                    sleep(pause).await;
                }
                Ok(())
            })
        }
    }

    fn session(
        loader: Arc<Loader>,
        device: Arc<mock::Device>,
    ) -> (Session<Arc<Loader>>, TablaEngine<Arc<Loader>>) {
        let tabla = TablaEngine::new(
            loader,
            device.clone(),
            Options::new(PathBuf::from("samples")),
            Style::Teentaal,
            80,
        );
        let melody = Sequencer::new(
            NoteBank::default(),
            device.clone(),
            Settings::default(),
            None,
        );
        let session = Session::new(tabla.clone(), melody, device, MixSettings::default())
            .expect("mock device should accept the mix");
        (session, tabla)
    }

    #[tokio::test(start_paused = true)]
    async fn test_controller() {
        let device = Arc::new(mock::Device::get("mock-device"));
        let loader = Arc::new(Loader::new(Duration::from_secs(8)));
        let (session, _tabla) = session(loader.clone(), device.clone());

        let driver = ScriptDriver::new(
            vec![
                Event::Style(Style::Ektal),
                Event::Key(PitchClass::E),
                Event::Control(Control::Volume(-3.0)),
                Event::Control(Control::TablaTempo(140)),
                Event::ToggleVoice(Voice::One),
                Event::ToggleTabla,
                Event::Status,
            ],
            Duration::from_millis(100),
        );
        let mut controller = Controller::new(session, driver);
        assert!(controller.join().await.is_ok(), "Error waiting for controller");

        // Ektal at 140 BPM plays the 150 BPM takes.
        assert_eq!(
            vec![
                "TABLA CHATI EKTAL 150BPM A.wav",
                "TABLA BAYA EKTAL 150BPM A.wav"
            ],
            loader.requested_names()
        );
        let events = device.events();
        assert!(events.contains(&mock::Event::Mix(MixSettings {
            master_db: -3.0,
            ..Default::default()
        })));
        assert!(events
            .iter()
            .any(|event| matches!(event, mock::Event::Start { .. })));

        // Closing the driver stops everything.
        assert_eq!(Some(&mock::Event::Stop), events.last());
        assert!(!device.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_tabla_loads() {
        let device = Arc::new(mock::Device::get("mock-device"));
        let loader = Arc::new(Loader::gated(Duration::from_secs(8)));
        let (session, tabla) = session(loader.clone(), device.clone());

        let driver = ScriptDriver::new(
            vec![Event::ToggleTabla, Event::ToggleTabla],
            Duration::from_secs(1),
        );
        let mut controller = Controller::new(session, driver);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(Phase::Loading, tabla.snapshot().phase);
        assert_eq!(2, loader.requests().len());

        // The second toggle is handled while the first start's stems are
        // still held at the gate.
        sleep(Duration::from_secs(1)).await;
        assert_eq!(Phase::Stopped, tabla.snapshot().phase);
        assert_eq!(Status::Stopped, tabla.status());
        assert_eq!(0, tabla.snapshot().pending_swaps);

        loader.release(2);
        assert!(controller.join().await.is_ok(), "Error waiting for controller");
        sleep(Duration::from_millis(10)).await;

        assert_eq!(Phase::Stopped, tabla.snapshot().phase);
        assert!(!device.is_playing());
        assert!(!device
            .events()
            .iter()
            .any(|event| matches!(event, mock::Event::Start { .. })));
        assert_eq!(2, loader.requests().len());
    }
}
