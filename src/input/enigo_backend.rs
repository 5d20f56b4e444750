//! OS input through enigo.
//!
//! Enigo is driven from a dedicated worker thread; async callers hand it
//! events over a channel and await the reply, so no runtime thread ever blocks
//! on the OS.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use enigo::{Axis, Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use std::sync::mpsc;
use std::thread;
use tokio::sync::oneshot;

use super::{InputBackend, InputEvent, KeyCode, KeyDirection, MouseButton};

struct Command {
    event: InputEvent,
    reply: oneshot::Sender<anyhow::Result<()>>,
}

pub struct EnigoBackend {
    tx: mpsc::Sender<Command>,
}

impl EnigoBackend {
    /// Starts the worker thread and waits for enigo to connect.
    pub fn spawn() -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<()>>();

        thread::Builder::new()
            .name("uiauto-input".to_string())
            .spawn(move || {
                let mut enigo = match Enigo::new(&Settings::default()) {
                    Ok(enigo) => {
                        let _ = ready_tx.send(Ok(()));
                        enigo
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(anyhow!("Failed to create input controller: {:?}", e)));
                        return;
                    }
                };
                for command in rx {
                    let result = apply(&mut enigo, command.event);
                    let _ = command.reply.send(result);
                }
                tracing::debug!("Input worker stopped");
            })
            .context("Failed to spawn input worker")?;

        ready_rx
            .recv()
            .context("Input worker exited during startup")??;
        Ok(Self { tx })
    }
}

#[async_trait]
impl InputBackend for EnigoBackend {
    async fn dispatch(&self, event: InputEvent) -> anyhow::Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command { event, reply })
            .map_err(|_| anyhow!("input worker stopped"))?;
        rx.await.map_err(|_| anyhow!("input worker dropped the request"))?
    }

    fn name(&self) -> &'static str {
        "enigo"
    }
}

fn apply(enigo: &mut Enigo, event: InputEvent) -> anyhow::Result<()> {
    match event {
        InputEvent::MoveTo { x, y } => enigo
            .move_mouse(x.round() as i32, y.round() as i32, Coordinate::Abs)
            .map_err(|e| anyhow!("Failed to move mouse: {:?}", e)),
        InputEvent::Press { button } => enigo
            .button(to_button(button), Direction::Press)
            .map_err(|e| anyhow!("Failed to press mouse button: {:?}", e)),
        InputEvent::Release { button } => enigo
            .button(to_button(button), Direction::Release)
            .map_err(|e| anyhow!("Failed to release mouse button: {:?}", e)),
        InputEvent::Wheel { dx, dy } => {
            if dx != 0 {
                enigo
                    .scroll(dx, Axis::Horizontal)
                    .map_err(|e| anyhow!("Failed to scroll horizontal: {:?}", e))?;
            }
            if dy != 0 {
                enigo
                    .scroll(dy, Axis::Vertical)
                    .map_err(|e| anyhow!("Failed to scroll vertical: {:?}", e))?;
            }
            Ok(())
        }
        InputEvent::Key { key, direction } => enigo
            .key(to_key(key)?, to_direction(direction))
            .map_err(|e| anyhow!("Failed to send key {:?}: {:?}", key, e)),
    }
}

fn to_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
    }
}

fn to_direction(direction: KeyDirection) -> Direction {
    match direction {
        KeyDirection::Press => Direction::Press,
        KeyDirection::Release => Direction::Release,
        KeyDirection::Click => Direction::Click,
    }
}

fn to_key(key: KeyCode) -> anyhow::Result<Key> {
    let key = match key {
        KeyCode::Char(c) => Key::Unicode(c),
        KeyCode::F(1) => Key::F1,
        KeyCode::F(2) => Key::F2,
        KeyCode::F(3) => Key::F3,
        KeyCode::F(4) => Key::F4,
        KeyCode::F(5) => Key::F5,
        KeyCode::F(6) => Key::F6,
        KeyCode::F(7) => Key::F7,
        KeyCode::F(8) => Key::F8,
        KeyCode::F(9) => Key::F9,
        KeyCode::F(10) => Key::F10,
        KeyCode::F(11) => Key::F11,
        KeyCode::F(12) => Key::F12,
        KeyCode::F(n) => return Err(anyhow!("no function key F{}", n)),
        KeyCode::Control => Key::Control,
        KeyCode::Alt => Key::Alt,
        KeyCode::Shift => Key::Shift,
        KeyCode::Meta => Key::Meta,
        KeyCode::Up => Key::UpArrow,
        KeyCode::Down => Key::DownArrow,
        KeyCode::Left => Key::LeftArrow,
        KeyCode::Right => Key::RightArrow,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Enter => Key::Return,
        KeyCode::Tab => Key::Tab,
        KeyCode::Escape => Key::Escape,
        KeyCode::Space => Key::Space,
        KeyCode::CapsLock => Key::CapsLock,
    };
    Ok(key)
}
