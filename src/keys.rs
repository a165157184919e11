use evdev::KeyCode;

/// Keystrokes the fbi viewer understands.
///
/// fbi binds `j`/`k` to next/previous, `+`/`-` to zoom, `v` to the status
/// line, `i` to the EXIF overlay, `q` to quit, and a typed decimal number
/// followed by `g` to jump to that image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    Next,
    Prev,
    ZoomIn,
    ZoomOut,
    ToggleInfo,
    ToggleVerbose,
    Quit,
    Confirm,
    /// Decimal digit 0-9.
    Digit(u8),
}

impl ControlKey {
    pub fn code(self) -> KeyCode {
        match self {
            ControlKey::Next => KeyCode::KEY_J,
            ControlKey::Prev => KeyCode::KEY_K,
            ControlKey::ZoomIn => KeyCode::KEY_KPPLUS,
            ControlKey::ZoomOut => KeyCode::KEY_KPMINUS,
            ControlKey::ToggleInfo => KeyCode::KEY_I,
            ControlKey::ToggleVerbose => KeyCode::KEY_V,
            ControlKey::Quit => KeyCode::KEY_Q,
            ControlKey::Confirm => KeyCode::KEY_G,
            ControlKey::Digit(d) => match d % 10 {
                0 => KeyCode::KEY_0,
                1 => KeyCode::KEY_1,
                2 => KeyCode::KEY_2,
                3 => KeyCode::KEY_3,
                4 => KeyCode::KEY_4,
                5 => KeyCode::KEY_5,
                6 => KeyCode::KEY_6,
                7 => KeyCode::KEY_7,
                8 => KeyCode::KEY_8,
                _ => KeyCode::KEY_9,
            },
        }
    }
}

/// Chord sent after a forced kill to bring a known console back to the
/// foreground.
pub const CONSOLE_RESTORE: [KeyCode; 3] = [
    KeyCode::KEY_LEFTCTRL,
    KeyCode::KEY_LEFTALT,
    KeyCode::KEY_F1,
];

/// Decimal digits of `n`, most significant first. `0` yields `[0]`.
pub fn digit_sequence(n: usize) -> Vec<u8> {
    let mut digits = Vec::new();
    let mut rest = n;
    loop {
        digits.push((rest % 10) as u8);
        rest /= 10;
        if rest == 0 {
            break;
        }
    }
    digits.reverse();
    digits
}

/// Every key code the virtual keyboard may emit, for uinput registration.
pub fn supported_codes() -> Vec<KeyCode> {
    let mut codes: Vec<KeyCode> = [
        ControlKey::Next,
        ControlKey::Prev,
        ControlKey::ZoomIn,
        ControlKey::ZoomOut,
        ControlKey::ToggleInfo,
        ControlKey::ToggleVerbose,
        ControlKey::Quit,
        ControlKey::Confirm,
    ]
    .into_iter()
    .map(ControlKey::code)
    .collect();
    for d in 0..10 {
        codes.push(ControlKey::Digit(d).code());
    }
    codes.extend(CONSOLE_RESTORE);
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_keys_match_fbi_bindings() {
        assert_eq!(ControlKey::Next.code(), KeyCode::KEY_J);
        assert_eq!(ControlKey::Prev.code(), KeyCode::KEY_K);
        assert_eq!(ControlKey::Confirm.code(), KeyCode::KEY_G);
        assert_eq!(ControlKey::Digit(7).code(), KeyCode::KEY_7);
    }

    #[test]
    fn digit_sequence_most_significant_first() {
        assert_eq!(digit_sequence(907), vec![9, 0, 7]);
        assert_eq!(digit_sequence(5), vec![5]);
        assert_eq!(digit_sequence(0), vec![0]);
    }

    #[test]
    fn supported_codes_cover_digits_and_restore_chord() {
        let codes = supported_codes();
        assert!(codes.contains(&KeyCode::KEY_0));
        assert!(codes.contains(&KeyCode::KEY_9));
        for code in CONSOLE_RESTORE {
            assert!(codes.contains(&code));
        }
    }
}
