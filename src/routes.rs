use crate::api::{attendance, leave_request, payroll, salary};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str) {
    cfg.service(
        web::scope(api_prefix)
            .service(
                web::scope("/attendance/{employee_id}")
                    // /attendance/{employee_id}/check-in
                    .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
                    // /attendance/{employee_id}/check-out
                    .service(web::resource("/check-out").route(web::post().to(attendance::check_out)))
                    .service(web::resource("/break").route(web::post().to(attendance::record_break)))
                    .service(web::resource("/monthly").route(web::get().to(attendance::monthly_summary)))
                    .service(web::resource("/weekly").route(web::get().to(attendance::weekly_summary))),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(web::resource("").route(web::post().to(leave_request::create_leave)))
                    // /leave/summary, before /{id}
                    .service(web::resource("/summary").route(web::get().to(leave_request::leave_summary)))
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::put().to(leave_request::update_leave)))
                    .service(web::resource("/{id}/approve").route(web::put().to(leave_request::approve_leave)))
                    .service(web::resource("/{id}/reject").route(web::put().to(leave_request::reject_leave)))
                    .service(web::resource("/{id}/cancel").route(web::put().to(leave_request::cancel_leave))),
            )
            .service(
                web::scope("/payroll")
                    // /payroll
                    .service(web::resource("").route(web::post().to(payroll::generate_payroll)))
                    // /payroll/{id}
                    .service(web::resource("/{id}").route(web::get().to(payroll::get_payroll)))
                    .service(web::resource("/{id}/submit").route(web::put().to(payroll::submit_payroll)))
                    .service(web::resource("/{id}/approve").route(web::put().to(payroll::approve_payroll)))
                    .service(web::resource("/{id}/pay").route(web::put().to(payroll::mark_paid)))
                    .service(web::resource("/{id}/lock").route(web::put().to(payroll::lock_payroll)))
                    .service(
                        web::resource("/{id}/recalculate").route(web::put().to(payroll::recalculate_payroll)),
                    ),
            )
            .service(
                web::resource("/salary/{employee_id}")
                    .route(web::put().to(salary::save_salary))
                    .route(web::get().to(salary::get_salary)),
            ),
    );
}
