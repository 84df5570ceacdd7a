use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use leafwing_input_manager::prelude::*;
use pueblo_shared::input::{InputKey, JoystickSample, PointerClassifier, PointerGesture};

use crate::scene::{JoystickInput, PlayerActivity, Scene, SceneSet};

#[derive(Reflect, Actionlike, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputAction {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    ToggleFlight,
    ClearSession,
    /// Store the current area's placements as the player's farm.
    SaveFinca,
    #[actionlike(DualAxis)]
    Stick,
    LeftClick,
}

/// Stick deflection reported as this many joystick pixels at full tilt.
const STICK_FULL_DISTANCE: f32 = 50.0;

const KEY_ACTIONS: [(InputAction, InputKey); 7] = [
    (InputAction::Forward, InputKey::Forward),
    (InputAction::Back, InputKey::Back),
    (InputAction::Left, InputKey::Left),
    (InputAction::Right, InputKey::Right),
    (InputAction::Jump, InputKey::Jump),
    (InputAction::ToggleFlight, InputKey::ToggleFlight),
    (InputAction::ClearSession, InputKey::ClearSession),
];

/// Last pointer gesture, read by the camera to decide whether a drag orbits.
#[derive(Resource, Default)]
pub struct Pointer {
    classifier: PointerClassifier,
    pub dragging: bool,
    pub last_gesture: Option<PointerGesture>,
}

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(InputManagerPlugin::<InputAction>::default());

    app.register_type::<InputAction>();

    let input_map = InputMap::<InputAction>::default()
        .with(InputAction::Forward, KeyCode::KeyW)
        .with(InputAction::Forward, KeyCode::ArrowUp)
        .with(InputAction::Back, KeyCode::KeyS)
        .with(InputAction::Back, KeyCode::ArrowDown)
        .with(InputAction::Left, KeyCode::KeyA)
        .with(InputAction::Left, KeyCode::ArrowLeft)
        .with(InputAction::Right, KeyCode::KeyD)
        .with(InputAction::Right, KeyCode::ArrowRight)
        .with(InputAction::Jump, KeyCode::Space)
        .with(InputAction::Jump, GamepadButton::South)
        .with(InputAction::ToggleFlight, KeyCode::KeyF)
        .with(InputAction::ClearSession, KeyCode::KeyX)
        .with(InputAction::SaveFinca, KeyCode::KeyG)
        .with(InputAction::LeftClick, MouseButton::Left)
        .with_dual_axis(InputAction::Stick, GamepadStick::LEFT);
    app.insert_resource(input_map);
    app.insert_resource(ActionState::<InputAction>::default());
    app.init_resource::<Pointer>();

    app.add_systems(
        Update,
        (feed_keys, feed_stick, classify_pointer).in_set(SceneSet::Input),
    );
}

fn feed_keys(
    actions: Res<ActionState<InputAction>>,
    mut scene: ResMut<Scene>,
    mut activity: ResMut<PlayerActivity>,
) {
    let keyboard = &mut scene.controller.input_mut().keyboard;
    for (action, key) in KEY_ACTIONS {
        if actions.just_pressed(&action) {
            keyboard.press(key);
            activity.0 = true;
        } else if actions.just_released(&action) {
            keyboard.release(key);
        }
    }
}

/// Converts the stick to the on-screen joystick's angle/distance form.
fn feed_stick(actions: Res<ActionState<InputAction>>, mut joystick: ResMut<JoystickInput>) {
    let axis = actions.axis_pair(&InputAction::Stick);
    joystick.0 = (axis.length_squared() > 0.0).then(|| JoystickSample {
        angle_deg: axis.y.atan2(axis.x).to_degrees(),
        distance: axis.length().min(1.0) * STICK_FULL_DISTANCE,
    });
}

fn classify_pointer(
    time: Res<Time>,
    actions: Res<ActionState<InputAction>>,
    mut motion: MessageReader<MouseMotion>,
    mut pointer: ResMut<Pointer>,
    mut activity: ResMut<PlayerActivity>,
) {
    if motion.read().count() > 0 {
        activity.0 = true;
    }

    let now = time.elapsed();
    if actions.just_pressed(&InputAction::LeftClick) {
        pointer.classifier.press(now);
        pointer.dragging = true;
        activity.0 = true;
    }
    if actions.just_released(&InputAction::LeftClick) {
        pointer.dragging = false;
        pointer.last_gesture = pointer.classifier.release(now);
        if let Some(gesture) = pointer.last_gesture {
            debug!("pointer {gesture:?}");
        }
    }
}
