//! Greedy decoding of the recognition output.

use tract_onnx::prelude::tract_ndarray::{Array2, ArrayView1, ArrayView3, Axis, Ix2, Ix3};
use tract_onnx::prelude::*;

use crate::codec::{CharCodec, BLANK};
use crate::config::OutputLayout;
use crate::error::{OcrError, Result};

/// Index of the largest score, first one wins on ties.
fn argmax(scores: ArrayView1<f32>) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

/// Argmax over the class axis, returned as `(N, T)`.
pub fn best_path(scores: ArrayView3<f32>, layout: OutputLayout) -> Array2<usize> {
    let indices = scores.map_axis(Axis(2), argmax);
    match layout {
        OutputLayout::TimeMajor => indices.reversed_axes(),
        OutputLayout::BatchMajor => indices,
    }
}

/// Class indices per batch element, `(N, T)`, from a raw model output.
///
/// `f32` outputs of rank 3 are scores and go through [`best_path`]. `i64`
/// outputs of rank 2 already hold class ids.
pub fn class_indices(output: &Tensor, layout: OutputLayout) -> Result<Array2<usize>> {
    if output.datum_type() == f32::datum_type() {
        let scores = output.to_array_view::<f32>()?.into_dimensionality::<Ix3>()?;
        Ok(best_path(scores, layout))
    } else if output.datum_type() == i64::datum_type() {
        let ids = output.to_array_view::<i64>()?.into_dimensionality::<Ix2>()?;
        let ids = ids.mapv(|i| usize::try_from(i).unwrap_or(usize::MAX));
        Ok(match layout {
            OutputLayout::TimeMajor => ids.reversed_axes(),
            OutputLayout::BatchMajor => ids,
        })
    } else {
        Err(OcrError::Output(format!(
            "expected f32 scores or i64 class ids, got {:?}",
            output.datum_type()
        )))
    }
}

/// Drops every character equal to its predecessor, then the blanks.
pub fn collapse(chars: &[char]) -> String {
    let mut text = String::with_capacity(chars.len());
    let mut previous = None;
    for &c in chars {
        if previous != Some(c) && c != BLANK {
            text.push(c);
        }
        previous = Some(c);
    }
    text
}

/// Greedy decode of every batch element.
pub fn decode(output: &Tensor, layout: OutputLayout, codec: &CharCodec) -> Result<Vec<String>> {
    let indices = class_indices(output, layout)?;
    Ok(indices
        .outer_iter()
        .map(|row| collapse(&codec.index_to_chars(&row.to_vec())))
        .collect())
}

/// Best `n` `(class, score)` pairs at every time step of the first image.
pub fn top_classes(output: &Tensor, layout: OutputLayout, n: usize) -> Result<Vec<Vec<(usize, f32)>>> {
    let scores = output.to_array_view::<f32>()?.into_dimensionality::<Ix3>()?;
    let steps = match layout {
        OutputLayout::TimeMajor => scores.index_axis_move(Axis(1), 0),
        OutputLayout::BatchMajor => scores.index_axis_move(Axis(0), 0),
    };
    Ok(steps
        .outer_iter()
        .map(|step| {
            let mut ranked: Vec<(usize, f32)> = step.iter().copied().enumerate().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            ranked.truncate(n);
            ranked
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tract_onnx::prelude::tract_ndarray::Array3;

    fn codec() -> CharCodec {
        CharCodec::from_map(HashMap::from([(0, 'a'), (1, 'b'), (2, 'c')]))
    }

    fn one_hot(classes: &[usize], num_classes: usize) -> Array3<f32> {
        // (T, N=1, K)
        let mut scores = Array3::<f32>::zeros((classes.len(), 1, num_classes));
        for (t, &k) in classes.iter().enumerate() {
            scores[[t, 0, k]] = 1.0;
        }
        scores
    }

    #[test]
    fn collapses_repeats_and_drops_blanks() {
        assert_eq!(collapse(&['a', 'a', 'b', ' ', 'c', 'c']), "abc");
        assert_eq!(collapse(&['a', ' ', 'a']), "aa");
        assert_eq!(collapse(&[' ', ' ']), "");
        assert_eq!(collapse(&[]), "");
    }

    #[test]
    fn decodes_time_major_scores() {
        // class 3 is the blank, absent from the codec
        let tensor: Tensor = one_hot(&[0, 0, 1, 3, 2, 2], 4).into();
        let texts = decode(&tensor, OutputLayout::TimeMajor, &codec()).unwrap();
        assert_eq!(texts, vec!["abc".to_string()]);
    }

    #[test]
    fn decodes_every_batch_element() {
        // (N=2, T=3, K=3)
        let mut scores = Array3::<f32>::zeros((2, 3, 3));
        for (t, k) in [2, 2, 0].into_iter().enumerate() {
            scores[[0, t, k]] = 1.0;
        }
        for (t, k) in [1, 0, 1].into_iter().enumerate() {
            scores[[1, t, k]] = 1.0;
        }
        let tensor: Tensor = scores.into();
        let texts = decode(&tensor, OutputLayout::BatchMajor, &codec()).unwrap();
        assert_eq!(texts, vec!["ca".to_string(), "bab".to_string()]);
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        let tensor: Tensor = Array3::<f32>::from_elem((1, 1, 3), 0.5).into();
        let indices = class_indices(&tensor, OutputLayout::TimeMajor).unwrap();
        assert_eq!(indices[[0, 0]], 0);
    }

    #[test]
    fn accepts_precomputed_class_ids() {
        // (T=4, N=1)
        let ids = tract_ndarray::arr2(&[[1i64], [1], [-1], [2]]);
        let tensor: Tensor = ids.into();
        let texts = decode(&tensor, OutputLayout::TimeMajor, &codec()).unwrap();
        assert_eq!(texts, vec!["bc".to_string()]);
    }

    #[test]
    fn rejects_other_dtypes() {
        let tensor: Tensor = tract_ndarray::arr2(&[[1u8]]).into();
        assert!(matches!(
            class_indices(&tensor, OutputLayout::TimeMajor),
            Err(OcrError::Output(_))
        ));
    }

    #[test]
    fn top_classes_are_ranked() {
        let mut scores = Array3::<f32>::zeros((2, 1, 3));
        scores[[0, 0, 2]] = 0.7;
        scores[[0, 0, 1]] = 0.2;
        scores[[1, 0, 0]] = 0.9;
        let tensor: Tensor = scores.into();

        let top = top_classes(&tensor, OutputLayout::TimeMajor, 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], vec![(2, 0.7), (1, 0.2)]);
        assert_eq!(top[1][0], (0, 0.9));
    }
}
