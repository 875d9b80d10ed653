use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::env::Environment;

// Field and object geometry, in game units.
const WIDTH: f64 = 200.0;
const HEIGHT: f64 = 120.0;
const BALL_SIZE: f64 = 2.0;
const PADDLE_WIDTH: f64 = 2.0;
const PADDLE_HEIGHT: f64 = 20.0;
const BALL_SPEED: f64 = 2.0;
const PADDLE_SPEED: f64 = 2.0;
const OPPONENT_SPEED: f64 = 1.0;

/// Minimal headless paddle game. The agent drives the left paddle; the
/// right paddle tracks the ball at a capped speed. The reward is -1 when
/// the ball exits past the agent, 1 when it exits past the opponent.
pub struct SimPong {
    ball_x: f64,
    ball_y: f64,
    ball_vx: f64,
    ball_vy: f64,
    left_paddle_y: f64,
    right_paddle_y: f64,
    rng: StdRng,
}

impl SimPong {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic construction for tests and reproducible runs.
    pub fn with_rng(rng: StdRng) -> Self {
        let mut env = SimPong {
            ball_x: 0.0,
            ball_y: 0.0,
            ball_vx: 0.0,
            ball_vy: 0.0,
            left_paddle_y: 0.0,
            right_paddle_y: 0.0,
            rng,
        };
        env.serve();
        env
    }

    /// Center the paddles and serve the ball at a random shallow angle.
    fn serve(&mut self) {
        self.ball_x = WIDTH / 2.0;
        self.ball_y = HEIGHT / 2.0;

        let angle = self.rng.random_range(-0.6..0.6);
        let direction = if self.rng.random_range(0.0..1.0) < 0.5 {
            -1.0
        } else {
            1.0
        };
        self.ball_vx = direction * BALL_SPEED * f64::cos(angle);
        self.ball_vy = BALL_SPEED * f64::sin(angle);

        self.left_paddle_y = (HEIGHT - PADDLE_HEIGHT) / 2.0;
        self.right_paddle_y = (HEIGHT - PADDLE_HEIGHT) / 2.0;
    }

    /// Unnormalized internal state, mirroring the observation layout.
    pub fn game_state(&self) -> [f64; 6] {
        [
            self.ball_x,
            self.ball_y,
            self.ball_vx,
            self.ball_vy,
            self.left_paddle_y,
            self.right_paddle_y,
        ]
    }

    fn paddle_intercepts(&self, paddle_y: f64) -> bool {
        self.ball_y + BALL_SIZE >= paddle_y && self.ball_y <= paddle_y + PADDLE_HEIGHT
    }
}

impl Default for SimPong {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimPong {
    fn start(&mut self) {
        self.serve();
    }

    fn reset(&mut self) {
        self.serve();
    }

    fn tick(&mut self, action: usize) -> f64 {
        // Agent paddle: action 1 moves up (towards smaller y).
        if action == 1 {
            self.left_paddle_y -= PADDLE_SPEED;
        } else {
            self.left_paddle_y += PADDLE_SPEED;
        }
        self.left_paddle_y = self.left_paddle_y.clamp(0.0, HEIGHT - PADDLE_HEIGHT);

        // Opponent paddle tracks the ball center at a capped speed.
        let target = self.ball_y + BALL_SIZE / 2.0 - PADDLE_HEIGHT / 2.0;
        let step = (target - self.right_paddle_y).clamp(-OPPONENT_SPEED, OPPONENT_SPEED);
        self.right_paddle_y = (self.right_paddle_y + step).clamp(0.0, HEIGHT - PADDLE_HEIGHT);

        // Advance the ball and bounce off the walls.
        self.ball_x += self.ball_vx;
        self.ball_y += self.ball_vy;
        if self.ball_y <= 0.0 {
            self.ball_y = -self.ball_y;
            self.ball_vy = -self.ball_vy;
        } else if self.ball_y + BALL_SIZE >= HEIGHT {
            self.ball_y = 2.0 * (HEIGHT - BALL_SIZE) - self.ball_y;
            self.ball_vy = -self.ball_vy;
        }

        // Paddle collisions reflect the ball back into the field.
        if self.ball_x <= PADDLE_WIDTH
            && self.ball_vx < 0.0
            && self.paddle_intercepts(self.left_paddle_y)
        {
            self.ball_x = PADDLE_WIDTH;
            self.ball_vx = -self.ball_vx;
        } else if self.ball_x + BALL_SIZE >= WIDTH - PADDLE_WIDTH
            && self.ball_vx > 0.0
            && self.paddle_intercepts(self.right_paddle_y)
        {
            self.ball_x = WIDTH - PADDLE_WIDTH - BALL_SIZE;
            self.ball_vx = -self.ball_vx;
        }

        // Terminal: the ball escaped past a paddle.
        if self.ball_x + BALL_SIZE < 0.0 {
            -1.0
        } else if self.ball_x > WIDTH {
            1.0
        } else {
            0.0
        }
    }

    fn observe_state(&self) -> Array1<f64> {
        Array1::from(vec![
            (self.ball_x / WIDTH - 0.5) * 2.0,
            (self.ball_y / HEIGHT - 0.5) * 2.0,
            self.ball_vx / BALL_SPEED,
            self.ball_vy / BALL_SPEED,
            (self.left_paddle_y / HEIGHT - 0.5) * 2.0,
            (self.right_paddle_y / HEIGHT - 0.5) * 2.0,
        ])
    }

    fn observe_frame(&self) -> Array1<f64> {
        let width = WIDTH as usize;
        let height = HEIGHT as usize;
        let mut frame = Array1::zeros(width * height);
        let mut draw = |x: f64, y: f64, w: f64, h: f64| {
            let x0 = (x.max(0.0) as usize).min(width - 1);
            let y0 = (y.max(0.0) as usize).min(height - 1);
            let x1 = ((x + w).max(0.0) as usize).min(width);
            let y1 = ((y + h).max(0.0) as usize).min(height);
            for row in y0..y1 {
                for col in x0..x1 {
                    frame[row * width + col] = 1.0;
                }
            }
        };
        draw(self.ball_x, self.ball_y, BALL_SIZE, BALL_SIZE);
        draw(0.0, self.left_paddle_y, PADDLE_WIDTH, PADDLE_HEIGHT);
        draw(
            WIDTH - PADDLE_WIDTH,
            self.right_paddle_y,
            PADDLE_WIDTH,
            PADDLE_HEIGHT,
        );
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SimPong {
        SimPong::with_rng(StdRng::seed_from_u64(42))
    }

    #[test]
    fn test_serve_centers_ball() {
        let env = seeded();
        let state = env.game_state();
        assert_eq!(state[0], WIDTH / 2.0);
        assert_eq!(state[1], HEIGHT / 2.0);
        assert!((state[2].powi(2) + state[3].powi(2)).sqrt() <= BALL_SPEED + 1e-9);
    }

    #[test]
    fn test_observation_is_normalized() {
        let env = seeded();
        let obs = env.observe_state();
        assert_eq!(obs.len(), 6);
        for &v in obs.iter() {
            assert!((-1.0..=1.0).contains(&v), "observation {v} out of range");
        }
    }

    #[test]
    fn test_dodging_the_ball_loses() {
        let mut env = seeded();
        env.start();
        // Steer the paddle away from the ball every tick; the first arrival
        // at the left edge ends the episode with a loss.
        for _ in 0..10_000 {
            let state = env.game_state();
            let paddle_center = state[4] + PADDLE_HEIGHT / 2.0;
            let action = if state[1] < paddle_center { 0 } else { 1 };
            let reward = env.tick(action);
            if reward != 0.0 {
                assert_eq!(reward, -1.0);
                return;
            }
        }
        panic!("episode never terminated");
    }

    #[test]
    fn test_frame_marks_objects() {
        let env = seeded();
        let frame = env.observe_frame();
        assert_eq!(frame.len(), (WIDTH as usize) * (HEIGHT as usize));
        let lit = frame.iter().filter(|&&v| v == 1.0).count();
        // Ball plus two paddles.
        assert!(lit >= (PADDLE_HEIGHT as usize) * 2);
        assert!(frame.iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn test_reset_restores_serve_position() {
        let mut env = seeded();
        env.start();
        for _ in 0..10 {
            env.tick(1);
        }
        env.reset();
        assert_eq!(env.game_state()[0], WIDTH / 2.0);
    }
}
