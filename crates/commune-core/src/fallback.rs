//! Built-in demonstration datasets for the public home page.
//!
//! Shown when the live listing is unavailable. Snapshots built from these are
//! flagged as [`DataOrigin::Fallback`](crate::resource::DataOrigin) and
//! cannot be edited.

use crate::models::{ItemId, News, PublishStatus, Slide};

fn news(id: u64, title: &str, category: &str, content: &str) -> News {
    News {
        id: ItemId::from(id),
        title: title.to_string(),
        content: content.to_string(),
        excerpt: None,
        category: Some(category.to_string()),
        image_url: None,
        status: PublishStatus::Published,
        created_at: None,
        updated_at: None,
    }
}

pub fn demo_news() -> Vec<News> {
    vec![
        news(
            1,
            "Conseil municipal du mois",
            "Vie municipale",
            "Le prochain conseil municipal se tiendra en salle des fêtes. La séance est publique.",
        ),
        news(
            2,
            "Travaux de voirie",
            "Travaux",
            "Des travaux de réfection de la chaussée sont prévus rue principale pendant deux semaines.",
        ),
        news(
            3,
            "Inscriptions à la cantine scolaire",
            "Éducation",
            "Les inscriptions pour la rentrée sont ouvertes en mairie et sur le portail citoyen.",
        ),
    ]
}

fn slide(id: u64, position: u32, title: &str, subtitle: &str) -> Slide {
    Slide {
        id: ItemId::from(id),
        title: title.to_string(),
        subtitle: Some(subtitle.to_string()),
        image_url: None,
        link_url: None,
        position,
        is_active: true,
        created_at: None,
        updated_at: None,
    }
}

pub fn demo_slides() -> Vec<Slide> {
    vec![
        slide(1, 0, "Bienvenue sur le portail de la commune", "Toute l'actualité de votre mairie"),
        slide(2, 1, "Démarches en ligne", "Réalisez vos démarches administratives sans vous déplacer"),
        slide(3, 2, "Agenda culturel", "Découvrez les événements de la saison"),
    ]
}
