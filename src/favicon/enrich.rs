use futures_util::future::join_all;

use super::LinkMetadataResolver;
use crate::models::{Project, SocialLink};

#[derive(Debug, Clone, Copy)]
enum IconField {
    Project,
    Github,
    Other,
}

/// Fills in missing project icons, resolving every missing one concurrently.
/// Lookups that come back empty leave the field as it was.
pub async fn enrich_projects(resolver: &LinkMetadataResolver, projects: &mut [Project]) {
    let mut wanted: Vec<(usize, IconField, String)> = Vec::new();
    for (index, project) in projects.iter().enumerate() {
        if project.project_favicon.is_empty() {
            wanted.push((index, IconField::Project, project.project_link.clone()));
        }
        if let (Some(link), None) = (&project.github_link, &project.github_favicon) {
            wanted.push((index, IconField::Github, link.clone()));
        }
        if let (Some(link), None) = (&project.other_link, &project.other_favicon) {
            wanted.push((index, IconField::Other, link.clone()));
        }
    }
    if wanted.is_empty() {
        return;
    }

    let icons = join_all(wanted.iter().map(|(_, _, url)| resolver.resolve_icon(url))).await;
    for ((index, field, _), icon) in wanted.into_iter().zip(icons) {
        if icon.is_empty() {
            continue;
        }
        let project = &mut projects[index];
        match field {
            IconField::Project => project.project_favicon = icon,
            IconField::Github => project.github_favicon = Some(icon),
            IconField::Other => project.other_favicon = Some(icon),
        }
    }
}

pub async fn enrich_social_links(resolver: &LinkMetadataResolver, links: &mut [SocialLink]) {
    let missing: Vec<usize> = links
        .iter()
        .enumerate()
        .filter(|(_, l)| l.favicon.is_empty())
        .map(|(i, _)| i)
        .collect();

    let icons = join_all(missing.iter().map(|&i| resolver.resolve_icon(&links[i].url))).await;
    for (index, icon) in missing.into_iter().zip(icons) {
        if !icon.is_empty() {
            links[index].favicon = icon;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::favicon::StaticFetcher;
    use crate::models::DEFAULT_PLATFORM;

    const GITHUB_ICON: &str = "https://github.githubassets.com/favicons/favicon.svg";

    fn project(link: &str, favicon: &str, github: Option<&str>) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            title: link.into(),
            description: String::new(),
            project_link: link.into(),
            github_link: github.map(str::to_string),
            other_link: None,
            project_favicon: favicon.into(),
            github_favicon: None,
            other_favicon: None,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn only_missing_icons_are_looked_up() {
        let fetcher = Arc::new(StaticFetcher::new());
        let resolver = LinkMetadataResolver::new(fetcher.clone());
        let mut projects = vec![
            project("https://github.com/ada/one", "", None),
            project("https://ada.dev", "https://ada.dev/icon.png", Some("https://github.com/ada/two")),
        ];

        enrich_projects(&resolver, &mut projects).await;

        assert_eq!(projects[0].project_favicon, GITHUB_ICON);
        assert_eq!(projects[1].project_favicon, "https://ada.dev/icon.png");
        assert_eq!(projects[1].github_favicon.as_deref(), Some(GITHUB_ICON));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn social_links_without_icons_are_filled() {
        let resolver = LinkMetadataResolver::new(Arc::new(StaticFetcher::new()));
        let mut links = vec![SocialLink {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            url: "https://github.com/ada".into(),
            favicon: String::new(),
            platform: DEFAULT_PLATFORM.into(),
            created_at: Utc::now(),
        }];

        enrich_social_links(&resolver, &mut links).await;
        assert_eq!(links[0].favicon, GITHUB_ICON);
    }
}
