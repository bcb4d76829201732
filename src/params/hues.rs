use super::limits::H_MAX;
use super::types::{HueInput, Values};
use ndarray::{Array2, ArrayView2, Axis};

/// RGB triple for a single hue letter.
pub fn hue_rgb(c: char) -> Option<[u8; 3]> {
    let rgb = match c.to_ascii_lowercase() {
        'r' => [255, 0, 0],
        'g' => [0, 255, 0],
        'b' => [0, 0, 255],
        'c' => [0, 255, 255],
        'm' => [255, 0, 255],
        'y' => [255, 255, 0],
        'w' => [255, 255, 255],
        _ => return None,
    };
    Some(rgb)
}

/// Parses hue input into an `(H, 3)` matrix.
pub fn parse_hues(input: &HueInput) -> Result<Array2<u8>, String> {
    let h = match input {
        HueInput::Named(s) => {
            let rows = s
                .chars()
                .take(H_MAX)
                .map(|c| hue_rgb(c).ok_or_else(|| format!("unknown hue '{c}'")))
                .collect::<Result<Vec<_>, _>>()?;
            if rows.is_empty() {
                return Err("empty hue string".into());
            }
            Array2::from_shape_fn((rows.len(), 3), |(i, j)| rows[i][j])
        }
        HueInput::Rgb(values) => {
            let rows: Vec<Vec<i64>> = match values {
                Values::Scalar(s) => vec![vec![*s; 3]],
                Values::Row(r) => vec![r.clone()],
                Values::Matrix(m) => m.clone(),
            };
            if rows.is_empty() || rows.iter().any(|r| r.len() != 3) {
                return Err("hues must be RGB triples".into());
            }
            let n = rows.len().min(H_MAX);
            Array2::from_shape_fn((n, 3), |(i, j)| rows[i][j].clamp(0, 255) as u8)
        }
    };
    if h.outer_iter().any(|row| row.iter().all(|&c| c == 0)) {
        return Err("black hues are not allowed".into());
    }
    Ok(h)
}

pub fn is_monochrome(h: ArrayView2<u8>) -> bool {
    h.outer_iter().all(|row| row[0] == row[1] && row[1] == row[2])
}

/// Hues are white and nothing else, no colorization needed.
pub fn is_plain(h: ArrayView2<u8>) -> bool {
    h.nrows() == 1 && h.iter().all(|&c| c == 255)
}

/// Averaging factor: how many times each channel gets exposed on average.
pub fn averaging(h: ArrayView2<u8>) -> f64 {
    let sums = h.mapv(|c| c as f64).sum_axis(Axis(0)) / 255.0;
    let mean = sums.mean().unwrap_or(1.0);
    mean.round().max(1.0 / 255.0)
}

/// Default hue string for `count` hues.
pub fn default_hues(count: usize, wdm: bool) -> String {
    if wdm {
        "w".repeat(count)
    } else if count == 1 {
        "w".into()
    } else if count == 2 {
        "rb".into()
    } else {
        "rgb".repeat(count / 3 + 1).chars().take(count).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_hues() {
        let h = parse_hues(&HueInput::from("rggb")).unwrap();
        assert_eq!(h.dim(), (4, 3));
        assert_eq!(h.row(1).to_vec(), vec![0, 255, 0]);
        assert!(!is_monochrome(h.view()));
        assert_eq!(averaging(h.view()), 1.0);
        assert!(!is_plain(h.view()));
        assert!(is_plain(parse_hues(&HueInput::from("w")).unwrap().view()));
        assert!(!is_plain(parse_hues(&HueInput::from("ww")).unwrap().view()));
    }

    #[test]
    fn test_reject_black_and_unknown() {
        assert!(parse_hues(&HueInput::from("rkb")).is_err());
        let black = HueInput::Rgb(Values::Matrix(vec![vec![255, 255, 255], vec![0, 0, 0]]));
        assert!(parse_hues(&black).is_err());
    }

    #[test]
    fn test_default_hues() {
        assert_eq!(default_hues(1, false), "w");
        assert_eq!(default_hues(2, false), "rb");
        assert_eq!(default_hues(4, false), "rgbr");
        assert_eq!(default_hues(3, true), "www");
    }
}
