use wirepost_common::GeneratedImage;

/// Below this an image is considered a poor match for the post.
pub const LOW_RELEVANCE_THRESHOLD: f32 = 0.3;

/// Keyword hit weights. Alt text is the strongest signal a provider gives
/// about what a photo actually shows.
const ALT_WEIGHT: f32 = 0.3;
const DESCRIPTION_WEIGHT: f32 = 0.2;
const TAG_WEIGHT: f32 = 0.2;
const CONCEPT_WEIGHT: f32 = 0.1;
const PROFESSIONAL_WEIGHT: f32 = 0.1;

const PROFESSIONAL_TERMS: &[&str] = &[
    "business",
    "professional",
    "office",
    "work",
    "team",
    "meeting",
];

const STOP_WORDS: &[&str] = &[
    "about", "after", "their", "there", "these", "this", "that", "with", "from", "have", "what",
    "when", "where", "which", "will", "would", "your", "into", "more", "than", "they", "them",
    "been", "being", "over", "just", "like", "some", "such",
];

/// Attach a relevance score to each candidate and sort best-first.
pub fn score_and_rank(
    mut images: Vec<GeneratedImage>,
    post_text: &str,
    keywords: &[String],
) -> Vec<GeneratedImage> {
    let concepts = concept_words(post_text);
    for image in &mut images {
        image.relevance_score = Some(score_image(image, keywords, &concepts));
    }
    images.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    images
}

/// Score in [0, 1] from keyword and concept hits across the image's
/// metadata fields.
pub fn score_image(image: &GeneratedImage, keywords: &[String], concepts: &[String]) -> f32 {
    let alt = image.alt_text.to_lowercase();
    let description = image
        .description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let tags: Vec<String> = image.tags.iter().map(|t| t.to_lowercase()).collect();

    let mut score = 0.0;
    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        if alt.contains(&keyword) {
            score += ALT_WEIGHT;
        }
        if description.contains(&keyword) {
            score += DESCRIPTION_WEIGHT;
        }
        if tags.iter().any(|tag| tag.contains(&keyword)) {
            score += TAG_WEIGHT;
        }
    }

    for concept in concepts {
        if alt.contains(concept.as_str())
            || description.contains(concept.as_str())
            || tags.iter().any(|tag| tag.contains(concept.as_str()))
        {
            score += CONCEPT_WEIGHT;
        }
    }

    if PROFESSIONAL_TERMS
        .iter()
        .any(|term| alt.contains(term) || tags.iter().any(|tag| tag.contains(term)))
    {
        score += PROFESSIONAL_WEIGHT;
    }

    score.clamp(0.0, 1.0)
}

/// Distinct meaningful words from the post text, for matching against alt
/// text beyond the explicit keywords.
pub fn concept_words(post_text: &str) -> Vec<String> {
    let mut words = Vec::new();
    for raw in post_text.split_whitespace() {
        let word: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if word.len() > 3 && !STOP_WORDS.contains(&word.as_str()) && !words.contains(&word) {
            words.push(word);
        }
    }
    words.truncate(10);
    words
}
