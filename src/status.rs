//! Human readable controller status.
//!
//! Mirrors what the handheld shows on its screen. Nothing here feeds back
//! into the command path.

use std::fmt;
use tracing::*;

use crate::{
    command::DriveCommand,
    sampler::{ButtonMask, DeadZone, JoystickSample},
};

/// Buttons on the Joy FeatherWing and the seesaw pin each one reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Y,
    X,
    Select,
}

impl Button {
    pub const ALL: [Button; 5] = [
        Button::A,
        Button::B,
        Button::Y,
        Button::X,
        Button::Select,
    ];

    pub fn pin(&self) -> u8 {
        match self {
            Button::A => 6,
            Button::B => 7,
            Button::Y => 9,
            Button::X => 10,
            Button::Select => 14,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::Y => "Y",
            Button::X => "X",
            Button::Select => "SEL",
        }
    }
}

pub fn pressed_buttons(mask: ButtonMask) -> Vec<Button> {
    Button::ALL
        .into_iter()
        .filter(|button| mask.is_pressed(button.pin()))
        .collect()
}

pub fn joystick_direction(horizontal: u16, vertical: u16, dead_zone: &DeadZone) -> String {
    let horizontal = if horizontal < dead_zone.low {
        "left"
    } else if horizontal > dead_zone.high {
        "right"
    } else {
        "center"
    };
    let vertical = if vertical < dead_zone.low {
        "up"
    } else if vertical > dead_zone.high {
        "down"
    } else {
        "center"
    };

    match (horizontal, vertical) {
        ("center", "center") => String::from("center"),
        ("center", vertical) => vertical.to_owned(),
        (horizontal, "center") => horizontal.to_owned(),
        (horizontal, vertical) => format!("{}-{}", horizontal, vertical),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Connected,
    Sent,
    Error,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LinkStatus::Connecting => "connecting...",
            LinkStatus::Connected => "connected",
            LinkStatus::Sent => "sent",
            LinkStatus::Error => "ERR",
        };
        write!(f, "{}", text)
    }
}

/// One screen worth of controller status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerStatus {
    pub joystick: String,
    pub direction: String,
    pub axes: String,
    pub buttons: String,
    pub link: String,
}

impl ControllerStatus {
    pub fn new(
        sample: &JoystickSample,
        command: &DriveCommand,
        dead_zone: &DeadZone,
        link: LinkStatus,
    ) -> Self {
        let pressed: Vec<&str> = pressed_buttons(sample.buttons)
            .iter()
            .map(Button::label)
            .collect();
        let buttons = if pressed.is_empty() {
            String::from("none")
        } else {
            pressed.join(",")
        };
        Self {
            joystick: format!("X:{:4}  Y:{:4}", sample.axis_x, sample.axis_y),
            // the board is mounted rotated a quarter turn
            direction: format!(
                "Dir: {}",
                joystick_direction(sample.axis_y, sample.axis_x, dead_zone)
            ),
            axes: format!("T:{:+.2} S:{:+.2}", command.throttle, command.steer),
            buttons: format!("Btns: {}", buttons),
            link: format!("Link: {}", link),
        }
    }

    pub fn lines(&self) -> [&str; 5] {
        [
            self.joystick.as_str(),
            self.direction.as_str(),
            self.axes.as_str(),
            self.buttons.as_str(),
            self.link.as_str(),
        ]
    }
}

pub trait StatusDisplay: Send {
    fn show(&mut self, status: &ControllerStatus);

    /// Link state before any sample was taken, while connecting.
    fn show_link(&mut self, link: LinkStatus);
}

/// Writes status to the log whenever it changes.
#[derive(Debug, Default)]
pub struct TracingDisplay {
    last: Option<ControllerStatus>,
}

impl StatusDisplay for TracingDisplay {
    fn show(&mut self, status: &ControllerStatus) {
        if self.last.as_ref() == Some(status) {
            return;
        }
        debug!(
            joystick = %status.joystick,
            direction = %status.direction,
            axes = %status.axes,
            buttons = %status.buttons,
            link = %status.link,
            "Controller status"
        );
        self.last = Some(status.clone());
    }

    fn show_link(&mut self, link: LinkStatus) {
        info!("Link: {}", link);
    }
}
