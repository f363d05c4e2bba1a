use dnb_core::Letter;
use tiny_skia::{Path, PathBuilder};

type Stroke = &'static [(f32, f32)];

/// Polylines of each letter in a unit box, y pointing down
pub fn strokes(letter: Letter) -> &'static [Stroke] {
    match letter {
        Letter::C => &[&[
            (0.85, 0.2),
            (0.65, 0.05),
            (0.35, 0.05),
            (0.15, 0.25),
            (0.15, 0.75),
            (0.35, 0.95),
            (0.65, 0.95),
            (0.85, 0.8),
        ]],
        Letter::H => &[
            &[(0.2, 0.05), (0.2, 0.95)],
            &[(0.8, 0.05), (0.8, 0.95)],
            &[(0.2, 0.5), (0.8, 0.5)],
        ],
        Letter::K => &[
            &[(0.2, 0.05), (0.2, 0.95)],
            &[(0.8, 0.05), (0.2, 0.6)],
            &[(0.4, 0.42), (0.8, 0.95)],
        ],
        Letter::L => &[&[(0.2, 0.05), (0.2, 0.95), (0.8, 0.95)]],
        Letter::Q => &[
            &[
                (0.5, 0.05),
                (0.2, 0.2),
                (0.15, 0.5),
                (0.2, 0.8),
                (0.5, 0.95),
                (0.8, 0.8),
                (0.85, 0.5),
                (0.8, 0.2),
                (0.5, 0.05),
            ],
            &[(0.55, 0.7), (0.85, 1.0)],
        ],
        Letter::R => &[
            &[
                (0.2, 0.95),
                (0.2, 0.05),
                (0.65, 0.05),
                (0.8, 0.15),
                (0.8, 0.4),
                (0.65, 0.5),
                (0.2, 0.5),
            ],
            &[(0.5, 0.5), (0.8, 0.95)],
        ],
        Letter::S => &[&[
            (0.8, 0.15),
            (0.65, 0.05),
            (0.35, 0.05),
            (0.2, 0.15),
            (0.2, 0.4),
            (0.35, 0.5),
            (0.65, 0.5),
            (0.8, 0.6),
            (0.8, 0.85),
            (0.65, 0.95),
            (0.35, 0.95),
            (0.2, 0.85),
        ]],
        Letter::T => &[&[(0.1, 0.05), (0.9, 0.05)], &[(0.5, 0.05), (0.5, 0.95)]],
    }
}

/// Outline of `letter` scaled into a `size` box inset by `margin`
pub fn letter_path(letter: Letter, size: f32, margin: f32) -> Option<Path> {
    let span = size - 2.0 * margin;
    let mut pb = PathBuilder::new();
    for stroke in strokes(letter) {
        let mut points = stroke.iter().map(|&(x, y)| (margin + x * span, margin + y * span));
        let (x, y) = points.next()?;
        pb.move_to(x, y);
        for (x, y) in points {
            pb.line_to(x, y);
        }
    }
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_letter_has_a_path_inside_its_box() {
        for letter in Letter::ALL {
            assert!(strokes(letter).iter().all(|s| s.len() >= 2), "{letter}");
            let path = letter_path(letter, 100.0, 10.0).unwrap();
            let b = path.bounds();
            assert!(b.left() >= 10.0 && b.top() >= 10.0, "{letter}");
            assert!(b.right() <= 90.0 && b.bottom() <= 90.0, "{letter}");
        }
    }
}
