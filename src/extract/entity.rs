//! Character and light cone card extraction.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::warn;

use super::image::ImageResolver;
use super::{first_text, ExtractError, PageSelectors};
use crate::models::{FeaturedCharacter, FeaturedItem, RarityTier, UNKNOWN_AFFINITY};

static PICTURE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("picture").expect("invalid picture selector"));
static IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("invalid img selector"));

/// Class fragment the wiki puts on 5★ cards.
pub const RARITY_FIVE_MARKER: &str = "rarity-5";

/// Whether serialized card markup carries the 5★ marker.
///
/// A plain substring test: the marker shows up on different elements
/// (`rarity-5` classes, `data-rarity="rarity-5"`) depending on the card.
pub fn has_rarity_five_marker(markup: &str) -> bool {
    markup.contains(RARITY_FIVE_MARKER)
}

/// Tier implied by card markup; anything without the 5★ marker is 4★.
pub fn rarity_from_markup(markup: &str) -> RarityTier {
    if has_rarity_five_marker(markup) {
        RarityTier::Five
    } else {
        RarityTier::Four
    }
}

/// Display name from a character page link.
///
/// `/star-rail/characters/dan-heng-imbibitor-lunae` → `Dan Heng Imbibitor Lunae`
pub fn name_from_link(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    let slug = path.trim_end_matches('/').rsplit('/').next()?;

    let name = slug
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    (!name.is_empty()).then_some(name)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Result of extracting one card.
#[derive(Debug)]
pub enum EntityOutcome<T> {
    Extracted(T),
    /// The card was malformed; a placeholder stands in for it
    Degraded { placeholder: T, error: ExtractError },
}

impl<T> EntityOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, EntityOutcome::Degraded { .. })
    }

    pub fn into_inner(self) -> T {
        match self {
            EntityOutcome::Extracted(value) => value,
            EntityOutcome::Degraded { placeholder, .. } => placeholder,
        }
    }
}

/// Reads character and item cards.
pub struct EntityExtractor<'a> {
    selectors: &'a PageSelectors,
    images: &'a ImageResolver,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(selectors: &'a PageSelectors, images: &'a ImageResolver) -> Self {
        Self { selectors, images }
    }

    /// Extract a character card.
    pub fn character(&self, card: ElementRef<'_>) -> Result<FeaturedCharacter, ExtractError> {
        let link = card
            .select(&self.selectors.character_link)
            .next()
            .ok_or(ExtractError::MissingElement("character link"))?;

        let name = link
            .value()
            .attr("href")
            .and_then(name_from_link)
            .ok_or(ExtractError::EmptyText("character link path"))?;

        let affinity = self
            .affinity(card)
            .unwrap_or_else(|| UNKNOWN_AFFINITY.to_string());

        Ok(FeaturedCharacter {
            name,
            rarity_tier: rarity_from_markup(&card.html()),
            affinity,
            image_url: Some(self.images.resolve(self.portrait(card))),
        })
    }

    /// Extract a light cone card.
    pub fn item(&self, card: ElementRef<'_>) -> Result<FeaturedItem, ExtractError> {
        let name = match card.select(&self.selectors.item_name).next() {
            Some(_) => first_text(&card, &self.selectors.item_name)
                .ok_or(ExtractError::EmptyText("item name"))?,
            None => return Err(ExtractError::MissingElement("item name")),
        };

        let image = card.select(&self.selectors.item_image).next();

        Ok(FeaturedItem {
            name,
            rarity_tier: rarity_from_markup(&card.html()),
            image_url: Some(self.images.resolve(image)),
        })
    }

    pub fn character_or_placeholder(&self, card: ElementRef<'_>) -> EntityOutcome<FeaturedCharacter> {
        match self.character(card) {
            Ok(character) => EntityOutcome::Extracted(character),
            Err(error) => {
                warn!("Malformed character card: {}", error);
                EntityOutcome::Degraded {
                    placeholder: FeaturedCharacter::placeholder(self.images.default_url()),
                    error,
                }
            }
        }
    }

    pub fn item_or_placeholder(&self, card: ElementRef<'_>) -> EntityOutcome<FeaturedItem> {
        match self.item(card) {
            Ok(item) => EntityOutcome::Extracted(item),
            Err(error) => {
                warn!("Malformed light cone card: {}", error);
                EntityOutcome::Degraded {
                    placeholder: FeaturedItem::placeholder(self.images.default_url()),
                    error,
                }
            }
        }
    }

    /// Element name from the icon inside the marker span.
    fn affinity(&self, card: ElementRef<'_>) -> Option<String> {
        let marker = card.select(&self.selectors.element_marker).next()?;

        marker
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find_map(|el| {
                ["alt", "title", "aria-label"]
                    .into_iter()
                    .filter_map(|attr| el.value().attr(attr))
                    .map(str::trim)
                    .find(|value| !value.is_empty())
            })
            .map(str::to_string)
    }

    /// The card's portrait: first `<picture>`, else first `<img>` outside the element marker.
    fn portrait<'b>(&self, card: ElementRef<'b>) -> Option<ElementRef<'b>> {
        card.select(&PICTURE).next().or_else(|| {
            card.select(&IMG).find(|img| {
                !img.ancestors()
                    .filter_map(ElementRef::wrap)
                    .take_while(|ancestor| ancestor.id() != card.id())
                    .any(|ancestor| self.selectors.element_marker.matches(&ancestor))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const DEFAULT: &str = "https://www.prydwen.gg/static/default-avatar.png";

    fn resolver() -> ImageResolver {
        ImageResolver::new("https://www.prydwen.gg", DEFAULT).unwrap()
    }

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        doc.select(&Selector::parse(css).unwrap()).next().unwrap()
    }

    const BOOTHILL_CARD: &str = r#"
        <span class="avatar-card">
            <a href="/star-rail/characters/boothill">
                <div class="avatar hsr rarity-5">
                    <picture>
                        <source type="image/webp" srcset="/static/boothill-74.webp 74w, /static/boothill-148.webp 148w">
                        <img alt="Boothill" src="data:image/gif;base64,R0lGODlhAQABAAAAACw=">
                    </picture>
                </div>
            </a>
            <span class="floating-element">
                <img alt="Physical" src="/static/ele_physical.png">
            </span>
        </span>"#;

    #[test]
    fn test_rarity_marker_predicate() {
        assert!(has_rarity_five_marker(r#"<div class="avatar rarity-5">"#));
        assert!(has_rarity_five_marker(r#"<div data-rarity="rarity-5">"#));
        assert!(!has_rarity_five_marker(r#"<div class="avatar rarity-4">"#));
        assert_eq!(rarity_from_markup("<div></div>"), RarityTier::Four);
    }

    #[test]
    fn test_name_from_link() {
        assert_eq!(
            name_from_link("/star-rail/characters/boothill").as_deref(),
            Some("Boothill")
        );
        assert_eq!(
            name_from_link("https://www.prydwen.gg/star-rail/characters/dan-heng-imbibitor-lunae/")
                .as_deref(),
            Some("Dan Heng Imbibitor Lunae")
        );
        assert_eq!(
            name_from_link("/star-rail/characters/march-7th?tab=build").as_deref(),
            Some("March 7th")
        );
        assert_eq!(name_from_link("/"), None);
        assert_eq!(name_from_link(""), None);
    }

    #[test]
    fn test_extract_character() {
        let doc = Html::parse_fragment(BOOTHILL_CARD);
        let selectors = PageSelectors::default();
        let images = resolver();
        let extractor = EntityExtractor::new(&selectors, &images);

        let character = extractor.character(first(&doc, ".avatar-card")).unwrap();

        assert_eq!(character.name, "Boothill");
        assert_eq!(character.affinity, "Physical");
        assert_eq!(character.rarity_tier, RarityTier::Five);
        assert_eq!(
            character.image_url.as_deref(),
            Some("https://www.prydwen.gg/static/boothill-148.webp")
        );
    }

    #[test]
    fn test_character_without_element_or_image() {
        let doc = Html::parse_fragment(
            r#"<span class="avatar-card"><a href="/star-rail/characters/pela"><div class="avatar rarity-4"></div></a></span>"#,
        );
        let selectors = PageSelectors::default();
        let images = resolver();
        let extractor = EntityExtractor::new(&selectors, &images);

        let character = extractor.character(first(&doc, ".avatar-card")).unwrap();

        assert_eq!(character.name, "Pela");
        assert_eq!(character.affinity, "Unknown");
        assert_eq!(character.rarity_tier, RarityTier::Four);
        assert_eq!(character.image_url.as_deref(), Some(DEFAULT));
    }

    #[test]
    fn test_portrait_skips_element_icon() {
        let doc = Html::parse_fragment(
            r#"<span class="avatar-card">
                <span class="floating-element"><img alt="Ice" src="/static/ele_ice.png"></span>
                <a href="/star-rail/characters/gallagher"><img src="/static/gallagher.png"></a>
            </span>"#,
        );
        let selectors = PageSelectors::default();
        let images = resolver();
        let extractor = EntityExtractor::new(&selectors, &images);

        let character = extractor.character(first(&doc, ".avatar-card")).unwrap();
        assert_eq!(character.affinity, "Ice");
        assert_eq!(
            character.image_url.as_deref(),
            Some("https://www.prydwen.gg/static/gallagher.png")
        );
    }

    #[test]
    fn test_character_without_link_degrades() {
        let doc = Html::parse_fragment(r#"<span class="avatar-card"><div class="avatar rarity-5"></div></span>"#);
        let selectors = PageSelectors::default();
        let images = resolver();
        let extractor = EntityExtractor::new(&selectors, &images);
        let card = first(&doc, ".avatar-card");

        assert!(matches!(
            extractor.character(card),
            Err(ExtractError::MissingElement(_))
        ));

        let outcome = extractor.character_or_placeholder(card);
        assert!(outcome.is_degraded());
        let placeholder = outcome.into_inner();
        assert_eq!(placeholder.name, "Unknown");
        assert_eq!(placeholder.rarity_tier, RarityTier::Four);
        assert_eq!(placeholder.image_url.as_deref(), Some(DEFAULT));
    }

    #[test]
    fn test_extract_item() {
        let doc = Html::parse_fragment(
            r#"<div class="featured-cone">
                <div class="hsr-set-image rarity-5">
                    <picture><img srcset="/static/cone-100.webp 100w, /static/cone-200.webp 200w" src="/static/cone.png"></picture>
                </div>
                <span class="hsr-set-name">  Sailing Towards
                    a Second Life </span>
            </div>"#,
        );
        let selectors = PageSelectors::default();
        let images = resolver();
        let extractor = EntityExtractor::new(&selectors, &images);

        let item = extractor.item(first(&doc, ".featured-cone")).unwrap();

        assert_eq!(item.name, "Sailing Towards a Second Life");
        assert_eq!(item.rarity_tier, RarityTier::Five);
        assert_eq!(
            item.image_url.as_deref(),
            Some("https://www.prydwen.gg/static/cone-200.webp")
        );
    }

    #[test]
    fn test_item_without_image_uses_default() {
        let doc = Html::parse_fragment(
            r#"<div class="featured-cone"><span class="hsr-set-name">Resolution Shines As Pearls of Sweat</span></div>"#,
        );
        let selectors = PageSelectors::default();
        let images = resolver();
        let extractor = EntityExtractor::new(&selectors, &images);

        let item = extractor.item(first(&doc, ".featured-cone")).unwrap();
        assert_eq!(item.rarity_tier, RarityTier::Four);
        assert_eq!(item.image_url.as_deref(), Some(DEFAULT));
    }

    #[test]
    fn test_item_with_blank_name_degrades() {
        let doc = Html::parse_fragment(
            r#"<div class="featured-cone"><span class="hsr-set-name">   </span></div>"#,
        );
        let selectors = PageSelectors::default();
        let images = resolver();
        let extractor = EntityExtractor::new(&selectors, &images);
        let card = first(&doc, ".featured-cone");

        assert!(matches!(extractor.item(card), Err(ExtractError::EmptyText(_))));
        assert!(extractor.item_or_placeholder(card).is_degraded());
    }
}
