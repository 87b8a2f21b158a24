use super::{FrameReport, Session};
use crate::game::animation::AnimationPlayer;
use crate::game::input::InputState;

/// Executes one rendered frame.
/// Ordered so that decisions see last frame's physics and rendering sees this
/// frame's: sense/decide -> fixed steps -> animation/effects -> interpolate.
pub(super) fn run_frame_phases(session: &mut Session, input: &InputState, dt: f32) -> FrameReport {
    // Level edits and capsule swaps since the last step are not in the query
    // structure yet.
    session.world.refresh_queries();

    // Sense contacts, advance locomotion, apply capsule and velocity.
    let commands = match session.character.as_mut() {
        Some(character) => character.begin_frame(&mut session.world, input, dt),
        None => None,
    };

    // Fixed physics steps; every step is recorded for interpolation.
    let world = &mut session.world;
    let character = &mut session.character;
    let outcome = session.stepper.advance(dt, |_| {
        world.step();
        if let Some(character) = character.as_mut() {
            character.record_step(world);
        }
    });

    // Animation, footsteps and landing effects, render position and camera.
    let frame = match (session.character.as_mut(), commands) {
        (Some(character), Some(commands)) => character.end_frame(
            &session.world,
            &commands,
            outcome.alpha,
            dt,
            &mut session.mixer,
            &mut session.effects,
        ),
        _ => None,
    };

    // Advance clip playback and particles by the rendered frame time.
    let frame_dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    session.mixer.advance(frame_dt);
    session.effects.update(frame_dt);

    session.frame += 1;
    session.elapsed += f64::from(frame_dt);

    FrameReport {
        frame: session.frame,
        time: session.elapsed,
        dt,
        steps: outcome.steps,
        alpha: outcome.alpha,
        capped: outcome.capped,
        character: frame,
        audio: session.audio_rx.try_iter().collect(),
        particles_active: session.effects.particles().active_count(),
    }
}
