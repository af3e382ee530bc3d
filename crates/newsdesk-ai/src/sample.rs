//! Built-in demonstration corpus, used when no curated corpus exists.

use newsdesk_core::{Category, LabeledDocument};

const SAMPLE: &[(Category, [&str; 8])] = &[
    (
        Category::Sports,
        [
            "The championship game was thrilling. The team scored in the final minutes.",
            "Athletes are training hard for the upcoming marathon competition.",
            "The football season starts next month with new draft picks.",
            "Tennis players compete for the grand slam title.",
            "The soccer match ended with a spectacular goal.",
            "Basketball team wins playoff series with overtime victory.",
            "Cricket match becomes historic with record-breaking innings.",
            "Olympic athletes prepare for international competition.",
        ],
    ),
    (
        Category::Politics,
        [
            "New legislation was passed by the parliament today.",
            "The political debate centers on healthcare policy.",
            "The presidential election is coming next year.",
            "Congress members discuss budget allocation.",
            "Political campaigns intensify in key states.",
            "Senate approves new trade agreement with allies.",
            "Political leaders meet for international summit.",
            "Government announces new policy on taxation.",
        ],
    ),
    (
        Category::Technology,
        [
            "New AI breakthrough announced by tech company.",
            "Smartphone technology reaches new heights with faster processors.",
            "Cybersecurity threats increase as hacking attempts rise.",
            "Tech startups raise millions in funding rounds.",
            "Cloud computing infrastructure sees rapid growth.",
            "Artificial intelligence transforms business operations.",
            "Software company releases groundbreaking application.",
            "Tech giants compete for market dominance.",
        ],
    ),
    (
        Category::Entertainment,
        [
            "The movie premiere was attended by celebrities.",
            "Music festival features top artists and bands.",
            "New TV series launches on streaming platform.",
            "Celebrity gossip and news from Hollywood.",
            "Award ceremony celebrates entertainment industry.",
            "Actor wins prestigious award for outstanding performance.",
            "Concert tour announces additional dates due to demand.",
            "Film breaks box office records on opening weekend.",
        ],
    ),
    (
        Category::Business,
        [
            "Stock market reaches all-time high.",
            "Corporate earnings exceed analyst expectations.",
            "New business partnerships announced.",
            "Startup founders share growth strategies.",
            "Economic indicators show strong market performance.",
            "Company announces major acquisition deal.",
            "Investors show confidence in emerging markets.",
            "Business leaders discuss global economy trends.",
        ],
    ),
    (
        Category::Health,
        [
            "New medical research shows positive results.",
            "Healthcare system faces challenges.",
            "Fitness tips for maintaining good health.",
            "Medical breakthrough in disease treatment.",
            "Mental health awareness campaign launches.",
            "Doctors recommend preventive health measures.",
            "Hospital implements new treatment protocol.",
            "Healthcare workers receive recognition and awards.",
        ],
    ),
    (
        Category::Science,
        [
            "Scientists discover new species in rainforest.",
            "Space exploration mission successful.",
            "Climate change research reveals critical findings.",
            "Physics experiment yields surprising results.",
            "Biology research advances human understanding.",
            "Environmental scientists study pollution impact.",
            "Researchers make quantum physics breakthrough.",
            "Scientific community celebrates discovery milestone.",
        ],
    ),
];

/// Eight short headlines for each of seven categories.
pub fn sample_corpus() -> Vec<LabeledDocument> {
    SAMPLE
        .iter()
        .flat_map(|(category, texts)| {
            texts
                .iter()
                .map(move |text| LabeledDocument::new(*text, *category))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seven_categories_of_eight() {
        let docs = sample_corpus();
        assert_eq!(docs.len(), 56);
        let cats: HashSet<Category> = docs.iter().map(|d| d.category).collect();
        assert_eq!(cats.len(), 7);
        assert!(!cats.contains(&Category::World));
    }
}
