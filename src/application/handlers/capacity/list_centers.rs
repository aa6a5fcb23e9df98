//! ListCentersHandler - Query handler for a course's centers and their
//! availability.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::capacity::{course_is_locked, Center, CenterError, LockReason};
use crate::domain::foundation::{CourseId, Timestamp};
use crate::ports::{CenterRepository, CourseReader, CourseSummary};

/// Query for the centers of a course.
#[derive(Debug, Clone)]
pub struct ListCentersQuery {
    pub course_id: CourseId,
}

/// One center as shown to a student picking a location.
#[derive(Debug, Clone, Serialize)]
pub struct CenterAvailability {
    pub center: Center,
    pub spots_remaining: u32,
    pub is_locked: bool,
    pub lock_reason: Option<LockReason>,
}

/// Result of listing centers.
#[derive(Debug, Clone, Serialize)]
pub struct ListCentersResult {
    pub course: CourseSummary,
    pub centers: Vec<CenterAvailability>,
    /// Every center refuses claims.
    pub course_locked: bool,
}

/// Handler for listing centers.
pub struct ListCentersHandler {
    centers: Arc<dyn CenterRepository>,
    courses: Arc<dyn CourseReader>,
}

impl ListCentersHandler {
    pub fn new(centers: Arc<dyn CenterRepository>, courses: Arc<dyn CourseReader>) -> Self {
        Self { centers, courses }
    }

    pub async fn handle(&self, query: ListCentersQuery) -> Result<ListCentersResult, CenterError> {
        let course = self
            .courses
            .find_by_id(&query.course_id)
            .await?
            .ok_or_else(|| CenterError::course_not_found(query.course_id))?;

        let now = Timestamp::now();
        let centers = self.centers.list_by_course(&course.id).await?;
        let course_locked = course_is_locked(&centers, now);

        let centers = centers
            .into_iter()
            .map(|center| {
                let lock_reason = center.lock_reason(now);
                CenterAvailability {
                    spots_remaining: center.spots_remaining(),
                    is_locked: lock_reason.is_some(),
                    lock_reason,
                    center,
                }
            })
            .collect();

        Ok(ListCentersResult {
            course,
            centers,
            course_locked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::foundation::CenterId;

    async fn setup() -> (InMemoryStore, ListCentersHandler, CourseId) {
        let store = InMemoryStore::new();
        let course_id = CourseId::new();
        store
            .insert_course(CourseSummary {
                id: course_id,
                title: "Coding Club".to_string(),
                slug: "coding-club".to_string(),
                price: 10_000,
                center_based: true,
            })
            .await;
        let handler = ListCentersHandler::new(Arc::new(store.clone()), Arc::new(store.clone()));
        (store, handler, course_id)
    }

    async fn add_center(store: &InMemoryStore, course_id: CourseId, deadline: Option<Timestamp>) -> Center {
        let center = Center::create(
            CenterId::new(),
            course_id,
            "Bastos",
            4,
            "owner",
            deadline,
            Timestamp::now(),
        )
        .unwrap();
        CenterRepository::insert(store, &center).await.unwrap();
        center
    }

    #[tokio::test]
    async fn course_without_centers_is_not_locked() {
        let (_store, handler, course_id) = setup().await;

        let result = handler.handle(ListCentersQuery { course_id }).await.unwrap();

        assert!(result.centers.is_empty());
        assert!(!result.course_locked);
    }

    #[tokio::test]
    async fn reports_reason_per_center() {
        let (store, handler, course_id) = setup().await;
        add_center(&store, course_id, None).await;
        add_center(&store, course_id, Some(Timestamp::now().minus_days(1))).await;

        let result = handler.handle(ListCentersQuery { course_id }).await.unwrap();

        assert_eq!(result.centers.len(), 2);
        let closed: Vec<_> = result.centers.iter().filter(|c| c.is_locked).collect();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].lock_reason, Some(LockReason::DeadlinePassed));
        assert!(!result.course_locked);
    }

    #[tokio::test]
    async fn course_is_locked_when_every_center_is() {
        let (store, handler, course_id) = setup().await;
        let center = add_center(&store, course_id, None).await;
        store.set_locked(&center.id, true, Timestamp::now()).await.unwrap();

        let result = handler.handle(ListCentersQuery { course_id }).await.unwrap();

        assert!(result.course_locked);
        assert_eq!(result.centers[0].spots_remaining, 4);
    }
}
