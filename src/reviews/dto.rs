use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::repo::{Review, ReviewImage, ReviewWithAuthor};
use crate::{auth::dto::UserName, error::FieldErrors};

pub const STARS_MESSAGE: &str = "Stars must be an integer from 1 to 5";

#[derive(Debug, Default, Deserialize)]
pub struct ReviewBody {
    pub review: Option<String>,
    pub stars: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewInput {
    pub review: String,
    pub stars: i32,
}

impl ReviewBody {
    pub fn validate(self) -> Result<ReviewInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let review = self.review.map(|r| r.trim().to_string()).unwrap_or_default();
        if review.is_empty() {
            errors.insert("review", "Review text is required".into());
        }
        let stars = self
            .stars
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .filter(|s| (1..=5).contains(s));
        if stars.is_none() {
            errors.insert("stars", STARS_MESSAGE.into());
        }
        match stars {
            Some(stars) if errors.is_empty() => Ok(ReviewInput {
                review,
                stars: stars as i32,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    #[serde(rename = "User")]
    pub user: UserName,
    #[serde(rename = "ReviewImages")]
    pub images: Vec<ReviewImage>,
}

#[derive(Debug, Serialize)]
pub struct ReviewList {
    #[serde(rename = "Reviews")]
    pub reviews: Vec<ReviewView>,
}

/// Attaches author names and images to reviews, keeping review order.
pub fn assemble(rows: Vec<ReviewWithAuthor>, images: Vec<ReviewImage>) -> Vec<ReviewView> {
    let mut by_review: HashMap<i64, Vec<ReviewImage>> = HashMap::new();
    for img in images {
        by_review.entry(img.review_id).or_default().push(img);
    }
    rows.into_iter()
        .map(|row| ReviewView {
            user: UserName {
                id: row.review.user_id,
                first_name: row.first_name,
                last_name: row.last_name,
            },
            images: by_review.remove(&row.review.id).unwrap_or_default(),
            review: row.review,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn body(review: Option<&str>, stars: serde_json::Value) -> ReviewBody {
        ReviewBody {
            review: review.map(Into::into),
            stars: Some(stars),
        }
    }

    #[test]
    fn accepts_text_and_stars_in_range() {
        let input = body(Some("Lovely stay"), json!(5)).validate().unwrap();
        assert_eq!(input.stars, 5);
        assert_eq!(input.review, "Lovely stay");
    }

    #[test]
    fn rejects_stars_out_of_range_or_not_integers() {
        for stars in [json!(0), json!(6), json!(4.5), json!("5")] {
            let errors = body(Some("ok"), stars).validate().unwrap_err();
            assert_eq!(errors["stars"], STARS_MESSAGE);
        }
    }

    #[test]
    fn rejects_blank_review() {
        let errors = ReviewBody::default().validate().unwrap_err();
        assert_eq!(errors["review"], "Review text is required");
        assert_eq!(errors["stars"], STARS_MESSAGE);
    }

    #[test]
    fn assemble_groups_images_by_review() {
        let author = Uuid::new_v4();
        let row = |id| ReviewWithAuthor {
            review: Review {
                id,
                user_id: author,
                spot_id: 1,
                review: "fine".into(),
                stars: 4,
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: OffsetDateTime::UNIX_EPOCH,
            },
            first_name: "Ada".into(),
            last_name: "Guest".into(),
        };
        let img = |id, review_id| ReviewImage {
            id,
            review_id,
            url: format!("https://img.example/r{id}.jpg"),
        };
        let views = assemble(vec![row(2), row(1)], vec![img(1, 1), img(2, 1), img(3, 2)]);
        assert_eq!(views[0].review.id, 2);
        assert_eq!(views[0].images.len(), 1);
        assert_eq!(views[1].images.len(), 2);

        let json = serde_json::to_value(&views[1]).unwrap();
        assert_eq!(json["User"]["firstName"], "Ada");
        assert_eq!(json["ReviewImages"][0]["url"], "https://img.example/r1.jpg");
        assert_eq!(json["spotId"], 1);
    }
}
