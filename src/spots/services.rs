use std::collections::HashMap;

use sqlx::PgPool;

use super::{
    dto::{SpotSummary, NO_PREVIEW},
    repo::{self, Spot, SpotImage, StarRow},
};

#[derive(Debug, Default, Clone, Copy)]
struct Rating {
    total: i64,
    count: i64,
}

impl Rating {
    fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total as f64 / self.count as f64)
    }
}

/// Folds review stars and images into per-spot summaries, keeping spot order.
/// The newest preview image wins; spots without one get [`NO_PREVIEW`].
pub fn summarize(spots: Vec<Spot>, stars: &[StarRow], images: &[SpotImage]) -> Vec<SpotSummary> {
    let mut ratings: HashMap<i64, Rating> = HashMap::new();
    for row in stars {
        let r = ratings.entry(row.spot_id).or_default();
        r.total += i64::from(row.stars);
        r.count += 1;
    }

    let mut previews: HashMap<i64, &SpotImage> = HashMap::new();
    for img in images.iter().filter(|i| i.preview) {
        previews
            .entry(img.spot_id)
            .and_modify(|cur| {
                if img.id > cur.id {
                    *cur = img;
                }
            })
            .or_insert(img);
    }

    spots
        .into_iter()
        .map(|spot| SpotSummary {
            avg_rating: ratings.get(&spot.id).and_then(Rating::average),
            preview_image: previews
                .get(&spot.id)
                .map(|img| img.url.clone())
                .unwrap_or_else(|| NO_PREVIEW.to_string()),
            spot,
        })
        .collect()
}

/// Summaries for a page of spots: one query per table, aggregated in memory.
pub async fn load_summaries(db: &PgPool, spots: Vec<Spot>) -> anyhow::Result<Vec<SpotSummary>> {
    if spots.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = spots.iter().map(|s| s.id).collect();
    let stars = repo::stars_for(db, &ids).await?;
    let images = repo::images_for(db, &ids).await?;
    Ok(summarize(spots, &stars, &images))
}

/// Review count and average stars of a single spot.
pub fn rating_of(stars: &[StarRow]) -> (i64, Option<f64>) {
    let rating = stars.iter().fold(Rating::default(), |mut acc, row| {
        acc.total += i64::from(row.stars);
        acc.count += 1;
        acc
    });
    (rating.count, rating.average())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn spot(id: i64) -> Spot {
        Spot {
            id,
            owner_id: Uuid::nil(),
            address: format!("{id} Main St"),
            city: "Tampa".into(),
            state: "FL".into(),
            country: "USA".into(),
            lat: 27.9,
            lng: -82.4,
            name: format!("Spot {id}"),
            description: "desc".into(),
            price: 100.0,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn image(id: i64, spot_id: i64, preview: bool) -> SpotImage {
        SpotImage {
            id,
            spot_id,
            url: format!("https://img.example/{id}.jpg"),
            preview,
        }
    }

    fn stars(spot_id: i64, stars: i32) -> StarRow {
        StarRow { spot_id, stars }
    }

    #[test]
    fn averages_per_spot() {
        let out = summarize(
            vec![spot(1), spot(2), spot(3)],
            &[stars(1, 5), stars(1, 4), stars(2, 3)],
            &[],
        );
        assert_eq!(out[0].avg_rating, Some(4.5));
        assert_eq!(out[1].avg_rating, Some(3.0));
        assert_eq!(out[2].avg_rating, None);
    }

    #[test]
    fn newest_preview_wins_and_fallback_applies() {
        let out = summarize(
            vec![spot(1), spot(2)],
            &[],
            &[image(10, 1, true), image(11, 1, false), image(12, 1, true), image(13, 2, false)],
        );
        assert_eq!(out[0].preview_image, "https://img.example/12.jpg");
        assert_eq!(out[1].preview_image, NO_PREVIEW);
    }

    #[test]
    fn keeps_spot_order() {
        let out = summarize(vec![spot(9), spot(3), spot(5)], &[], &[]);
        let ids: Vec<i64> = out.iter().map(|s| s.spot.id).collect();
        assert_eq!(ids, vec![9, 3, 5]);
    }

    #[test]
    fn summary_json_shape() {
        let out = summarize(vec![spot(1)], &[stars(1, 4)], &[image(1, 1, true)]);
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["avgRating"], 4.0);
        assert_eq!(json["previewImage"], "https://img.example/1.jpg");
        assert!(json.get("ownerId").is_some());
    }

    #[test]
    fn rating_of_empty_is_zero_and_none() {
        assert_eq!(rating_of(&[]), (0, None));
        assert_eq!(rating_of(&[stars(1, 2), stars(1, 5)]), (2, Some(3.5)));
    }
}
