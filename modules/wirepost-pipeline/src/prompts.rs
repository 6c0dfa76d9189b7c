use rand::Rng;

/// A post-writing prompt template. `{context}` is replaced with the
/// selected topic's article digest before the model call.
pub struct PostPrompt {
    pub id: &'static str,
    pub style: &'static str,
    pub template: &'static str,
}

/// Rotating pool of writing styles so consecutive posts do not read alike.
pub const POST_PROMPTS: &[PostPrompt] = &[
    PostPrompt {
        id: "insightful-analysis",
        style: "analytical",
        template: "Write a LinkedIn post analyzing the key trends in the following news. \
                   Open with a sharp observation, connect the stories to a bigger industry shift, \
                   and close with a question that invites discussion.\n\n{context}",
    },
    PostPrompt {
        id: "practical-takeaways",
        style: "practical",
        template: "Write a LinkedIn post distilling the following news into 3-4 practical \
                   takeaways for working professionals. Keep each takeaway to one or two \
                   sentences and make them concrete.\n\n{context}",
    },
    PostPrompt {
        id: "contrarian-view",
        style: "contrarian",
        template: "Write a LinkedIn post that takes a respectful contrarian angle on the \
                   following news. Acknowledge the mainstream read, then explain what it \
                   misses and why that matters.\n\n{context}",
    },
    PostPrompt {
        id: "storytelling",
        style: "narrative",
        template: "Write a LinkedIn post that weaves the following news into a short \
                   narrative. Start in the middle of the action, keep paragraphs short, \
                   and land on a lesson readers can use.\n\n{context}",
    },
    PostPrompt {
        id: "future-outlook",
        style: "forward-looking",
        template: "Write a LinkedIn post projecting where the developments in the following \
                   news are headed over the next 12-24 months. Be specific about what changes \
                   for teams and businesses.\n\n{context}",
    },
    PostPrompt {
        id: "question-driven",
        style: "conversational",
        template: "Write a LinkedIn post built around one provocative question raised by the \
                   following news. Explore two or three possible answers without settling the \
                   debate, and ask readers where they stand.\n\n{context}",
    },
    PostPrompt {
        id: "data-highlight",
        style: "data-driven",
        template: "Write a LinkedIn post that leads with the most striking fact or number in \
                   the following news, then explains in plain language why it matters to \
                   professionals outside the niche.\n\n{context}",
    },
    PostPrompt {
        id: "career-lens",
        style: "career-focused",
        template: "Write a LinkedIn post looking at the following news through a career lens: \
                   which skills become more valuable, what to learn next, and how to position \
                   yourself. Keep the advice actionable.\n\n{context}",
    },
];

/// Draw one template uniformly at random.
pub fn random_prompt<R: Rng>(rng: &mut R) -> &'static PostPrompt {
    &POST_PROMPTS[rng.random_range(0..POST_PROMPTS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_carries_the_context_placeholder() {
        for prompt in POST_PROMPTS {
            assert!(
                prompt.template.contains("{context}"),
                "template {} lacks placeholder",
                prompt.id
            );
        }
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<_> = POST_PROMPTS.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), POST_PROMPTS.len());
    }

    #[test]
    fn random_prompt_comes_from_the_pool() {
        let mut rng = rand::rng();
        let drawn = random_prompt(&mut rng);
        assert!(POST_PROMPTS.iter().any(|p| p.id == drawn.id));
    }
}
