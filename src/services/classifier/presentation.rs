use crate::models::classify_types::{Prediction, ResultHandoff, ResultView};

pub const NO_RESULTS_MESSAGE: &str = "No results found";
pub const NO_RESULT_TEXT: &str = "No results available";
pub const IMAGE_NOT_FOUND: &str = "Image not found";

/// Index of the largest score; the first index wins a tie.
pub fn arg_max(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Whole percent, truncated toward zero.
pub fn to_percent(score: f32) -> i32 {
    (score * 100.0) as i32
}

/// The top prediction, or `None` for a missing or empty vector.
pub fn top_prediction(scores: Option<&[f32]>, labels: &[String]) -> Option<Prediction> {
    let scores = scores?;
    let idx = arg_max(scores)?;
    let class_name = labels
        .get(idx)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", idx));
    Some(Prediction {
        class_name,
        percent: to_percent(scores[idx]),
    })
}

impl ResultView {
    /// Fill in user-facing fallbacks for anything the handoff lacks.
    pub fn from_handoff(handoff: Option<ResultHandoff>) -> Self {
        let handoff = handoff.unwrap_or(ResultHandoff {
            result_text: None,
            image_uri: None,
        });

        if handoff.result_text.is_none() {
            tracing::error!("No classification result received");
        }
        let notice = match handoff.image_uri {
            Some(ref uri) => {
                tracing::debug!(%uri, "result image");
                None
            }
            None => {
                tracing::error!("No image URI received");
                Some(IMAGE_NOT_FOUND.to_string())
            }
        };

        Self {
            result_text: handoff
                .result_text
                .unwrap_or_else(|| NO_RESULT_TEXT.to_string()),
            image_uri: handoff.image_uri,
            notice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["Non Cancer".to_string(), "Cancer".to_string()]
    }

    fn text(scores: &[f32]) -> Option<String> {
        top_prediction(Some(scores), &labels()).map(|p| p.display_text())
    }

    #[test]
    fn higher_score_wins() {
        assert_eq!(text(&[0.2, 0.8]).as_deref(), Some("Cancer: 80%"));
        assert_eq!(text(&[0.9, 0.1]).as_deref(), Some("Non Cancer: 90%"));
    }

    #[test]
    fn tie_goes_to_first_label() {
        assert_eq!(text(&[0.5, 0.5]).as_deref(), Some("Non Cancer: 50%"));
        assert_eq!(arg_max(&[1.0, 3.0, 3.0]), Some(1));
    }

    #[test]
    fn percent_truncates() {
        assert_eq!(to_percent(0.999), 99);
        assert_eq!(to_percent(0.0), 0);
        assert_eq!(to_percent(1.0), 100);
    }

    #[test]
    fn empty_or_missing_vector_has_no_prediction() {
        assert_eq!(top_prediction(Some(&[]), &labels()), None);
        assert_eq!(top_prediction(None, &labels()), None);
    }

    #[test]
    fn unlabelled_index_gets_placeholder_name() {
        let p = top_prediction(Some(&[0.1, 0.2, 0.7]), &labels()).unwrap();
        assert_eq!(p.display_text(), "class_2: 70%");
    }

    #[test]
    fn view_keeps_complete_handoff() {
        let view = ResultView::from_handoff(Some(ResultHandoff {
            result_text: Some("Cancer: 80%".into()),
            image_uri: Some("file:///a.jpg".into()),
        }));
        assert_eq!(view.result_text, "Cancer: 80%");
        assert_eq!(view.image_uri.as_deref(), Some("file:///a.jpg"));
        assert_eq!(view.notice, None);
    }

    #[test]
    fn view_falls_back_when_fields_missing() {
        let view = ResultView::from_handoff(None);
        assert_eq!(view.result_text, NO_RESULT_TEXT);
        assert_eq!(view.image_uri, None);
        assert_eq!(view.notice.as_deref(), Some(IMAGE_NOT_FOUND));
    }
}
