// SPDX-License-Identifier: MPL-2.0
//! Keyboard subscription for the application.
//!
//! F11 and Escape always reach the app. Arrow keys and Space are dropped when
//! a widget already captured them.

use super::Message;
use iced::keyboard::{self, key::Named, Key};
use iced::{event, Event, Subscription};

pub fn create_event_subscription() -> Subscription<Message> {
    event::listen_with(|event, status, window_id| {
        let Event::Keyboard(keyboard::Event::KeyPressed { key, .. }) = event else {
            return None;
        };
        let Key::Named(named) = key else {
            return None;
        };
        map_key(named, status, window_id)
    })
}

fn map_key(key: Named, status: event::Status, window_id: iced::window::Id) -> Option<Message> {
    match key {
        Named::F11 => Some(Message::ToggleFullscreen(window_id)),
        Named::Escape => Some(Message::ExitFullscreen(window_id)),
        _ if status == event::Status::Captured => None,
        Named::ArrowLeft => Some(Message::Navigate(-1)),
        Named::ArrowRight => Some(Message::Navigate(1)),
        Named::Space => Some(Message::TogglePlayback),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iced::window;

    #[test]
    fn arrows_and_space_map_when_not_captured() {
        let id = window::Id::unique();
        assert!(matches!(
            map_key(Named::ArrowLeft, event::Status::Ignored, id),
            Some(Message::Navigate(-1))
        ));
        assert!(matches!(
            map_key(Named::ArrowRight, event::Status::Ignored, id),
            Some(Message::Navigate(1))
        ));
        assert!(matches!(
            map_key(Named::Space, event::Status::Ignored, id),
            Some(Message::TogglePlayback)
        ));
        assert!(map_key(Named::Space, event::Status::Captured, id).is_none());
    }

    #[test]
    fn fullscreen_keys_always_map() {
        let id = window::Id::unique();
        assert!(matches!(
            map_key(Named::F11, event::Status::Captured, id),
            Some(Message::ToggleFullscreen(w)) if w == id
        ));
        assert!(matches!(
            map_key(Named::Escape, event::Status::Ignored, id),
            Some(Message::ExitFullscreen(_))
        ));
        assert!(map_key(Named::Tab, event::Status::Ignored, id).is_none());
    }
}
