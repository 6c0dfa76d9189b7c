use wirepost_common::{GeneratedImage, ImageSourceKind, NewsItem};

/// Turn images embedded in fetched articles into editorial candidates.
/// The article title stands in as alt text since feeds rarely carry one.
pub fn harvest(items: &[NewsItem]) -> Vec<GeneratedImage> {
    items
        .iter()
        .flat_map(|item| {
            item.image_urls.iter().map(|url| GeneratedImage {
                url: url.clone(),
                alt_text: item.title.clone(),
                source_kind: ImageSourceKind::Editorial,
                attribution: Some(item.source_name.clone()),
                description: None,
                tags: Vec::new(),
                relevance_score: None,
                feed_name: Some(item.source_name.clone()),
                article_url: Some(item.link.clone()),
            })
        })
        .collect()
}
