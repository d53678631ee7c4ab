// SPDX-License-Identifier: MPL-2.0
//! Internationalization (i18n) support for the application.
//!
//! Translations are Fluent `.ftl` files embedded at build time from
//! `assets/i18n/`. The active locale is picked once at startup from, in
//! order, the `--lang` flag, the `[general] language` setting, the OS locale
//! and finally `en-US`.

pub mod fluent;

pub use fluent::I18n;
