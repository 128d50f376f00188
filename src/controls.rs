use bevy::prelude::*;

/// Logical driving input for one tick. The simulation never sees key codes,
/// only these booleans, so rebinding keys cannot change physics behavior.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RaceInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub drift: bool,
}

/// Maps the logical driving actions to keyboard keys. Stored in the save
/// file as key-name strings so rebindings persist.
#[derive(Resource, Clone, Debug)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub drift: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            backward: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            drift: KeyCode::Space,
        }
    }
}

const KEY_NAMES: &[(&str, KeyCode)] = &[
    ("W", KeyCode::KeyW),
    ("A", KeyCode::KeyA),
    ("S", KeyCode::KeyS),
    ("D", KeyCode::KeyD),
    ("Q", KeyCode::KeyQ),
    ("E", KeyCode::KeyE),
    ("Z", KeyCode::KeyZ),
    ("X", KeyCode::KeyX),
    ("C", KeyCode::KeyC),
    ("Up", KeyCode::ArrowUp),
    ("Down", KeyCode::ArrowDown),
    ("Left", KeyCode::ArrowLeft),
    ("Right", KeyCode::ArrowRight),
    ("Space", KeyCode::Space),
    ("LShift", KeyCode::ShiftLeft),
    ("RShift", KeyCode::ShiftRight),
    ("LCtrl", KeyCode::ControlLeft),
    ("RCtrl", KeyCode::ControlRight),
];

pub fn key_from_name(name: &str) -> Option<KeyCode> {
    KEY_NAMES
        .iter()
        .find(|(key_name, _)| *key_name == name)
        .map(|(_, code)| *code)
}

pub fn key_name(code: KeyCode) -> Option<&'static str> {
    KEY_NAMES
        .iter()
        .find(|(_, key_code)| *key_code == code)
        .map(|(name, _)| *name)
}

impl KeyBindings {
    /// Rebuilds bindings from saved key names; unknown names keep the
    /// default for that action.
    pub fn from_names(names: &[(String, String)]) -> Self {
        let mut bindings = Self::default();
        for (action, name) in names {
            let Some(code) = key_from_name(name) else {
                warn!("unknown key name in save data: {name}");
                continue;
            };
            match action.as_str() {
                "forward" => bindings.forward = code,
                "backward" => bindings.backward = code,
                "left" => bindings.left = code,
                "right" => bindings.right = code,
                "drift" => bindings.drift = code,
                other => warn!("unknown action in save data: {other}"),
            }
        }
        bindings
    }

    pub fn to_names(&self) -> Vec<(String, String)> {
        [
            ("forward", self.forward),
            ("backward", self.backward),
            ("left", self.left),
            ("right", self.right),
            ("drift", self.drift),
        ]
        .into_iter()
        .filter_map(|(action, code)| Some((action.to_string(), key_name(code)?.to_string())))
        .collect()
    }
}

/// Samples the keyboard into the logical input resource once per tick.
pub fn read_race_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    mut input: ResMut<RaceInput>,
) {
    *input = RaceInput {
        forward: keyboard.pressed(bindings.forward),
        backward: keyboard.pressed(bindings.backward),
        left: keyboard.pressed(bindings.left),
        right: keyboard.pressed(bindings.right),
        drift: keyboard.pressed(bindings.drift),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_round_trip_through_names() {
        let bindings = KeyBindings {
            forward: KeyCode::ArrowUp,
            backward: KeyCode::ArrowDown,
            left: KeyCode::ArrowLeft,
            right: KeyCode::ArrowRight,
            drift: KeyCode::ShiftLeft,
        };
        let restored = KeyBindings::from_names(&bindings.to_names());
        assert_eq!(restored.forward, KeyCode::ArrowUp);
        assert_eq!(restored.drift, KeyCode::ShiftLeft);
    }

    #[test]
    fn unknown_names_fall_back_to_defaults() {
        let restored = KeyBindings::from_names(&[
            ("forward".to_string(), "NotAKey".to_string()),
            ("drift".to_string(), "LShift".to_string()),
        ]);
        assert_eq!(restored.forward, KeyCode::KeyW);
        assert_eq!(restored.drift, KeyCode::ShiftLeft);
    }
}
