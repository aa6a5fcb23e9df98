//! CreateCenterHandler - Command handler for adding a center to a course.

use std::sync::Arc;

use crate::domain::capacity::{Center, CenterError};
use crate::domain::foundation::{CenterId, CourseId, Timestamp};
use crate::ports::{CenterRepository, CourseReader};

/// Command to create a center.
#[derive(Debug, Clone)]
pub struct CreateCenterCommand {
    pub course_id: CourseId,
    pub name: String,
    pub capacity: u32,
    pub owner_contact: String,
    pub enrollment_deadline: Option<Timestamp>,
}

/// Handler for creating centers.
pub struct CreateCenterHandler {
    centers: Arc<dyn CenterRepository>,
    courses: Arc<dyn CourseReader>,
}

impl CreateCenterHandler {
    pub fn new(centers: Arc<dyn CenterRepository>, courses: Arc<dyn CourseReader>) -> Self {
        Self { centers, courses }
    }

    pub async fn handle(&self, cmd: CreateCenterCommand) -> Result<Center, CenterError> {
        let course = self
            .courses
            .find_by_id(&cmd.course_id)
            .await?
            .ok_or_else(|| CenterError::course_not_found(cmd.course_id))?;

        if !course.center_based {
            return Err(CenterError::not_center_backed(course.id));
        }

        let center = Center::create(
            CenterId::new(),
            course.id,
            cmd.name,
            cmd.capacity,
            cmd.owner_contact,
            cmd.enrollment_deadline,
            Timestamp::now(),
        )?;

        self.centers.insert(&center).await?;

        tracing::info!(
            center_id = %center.id,
            course_id = %center.course_id,
            capacity = center.capacity,
            "Center created"
        );
        Ok(center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::ports::CourseSummary;

    async fn setup(center_based: bool) -> (InMemoryStore, CreateCenterHandler, CourseId) {
        let store = InMemoryStore::new();
        let course_id = CourseId::new();
        store
            .insert_course(CourseSummary {
                id: course_id,
                title: "Robotics".to_string(),
                slug: "robotics".to_string(),
                price: 15_000,
                center_based,
            })
            .await;
        let handler = CreateCenterHandler::new(Arc::new(store.clone()), Arc::new(store.clone()));
        (store, handler, course_id)
    }

    fn command(course_id: CourseId, capacity: u32) -> CreateCenterCommand {
        CreateCenterCommand {
            course_id,
            name: "Bonamoussadi Hub".to_string(),
            capacity,
            owner_contact: "owner@example.com".to_string(),
            enrollment_deadline: None,
        }
    }

    #[tokio::test]
    async fn creates_empty_center() {
        let (store, handler, course_id) = setup(true).await;

        let center = handler.handle(command(course_id, 12)).await.unwrap();

        assert_eq!(center.current_enrollment, 0);
        assert_eq!(center.total_earnings, 0);
        let stored = CenterRepository::find_by_id(&store, &center.id).await.unwrap();
        assert_eq!(stored, Some(center));
    }

    #[tokio::test]
    async fn rejects_zero_capacity() {
        let (_store, handler, course_id) = setup(true).await;

        let err = handler.handle(command(course_id, 0)).await.unwrap_err();

        assert!(matches!(err, CenterError::ValidationFailed { ref field, .. } if field == "capacity"));
    }

    #[tokio::test]
    async fn rejects_course_without_centers() {
        let (_store, handler, course_id) = setup(false).await;

        let err = handler.handle(command(course_id, 5)).await.unwrap_err();

        assert_eq!(err, CenterError::not_center_backed(course_id));
    }

    #[tokio::test]
    async fn rejects_unknown_course() {
        let (_store, handler, _) = setup(true).await;
        let missing = CourseId::new();

        let err = handler.handle(command(missing, 5)).await.unwrap_err();

        assert_eq!(err, CenterError::course_not_found(missing));
    }
}
